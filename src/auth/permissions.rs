use super::Principal;

/// A single requirement a route places on the acting principal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    RequireLogin,
    RequireAdmin,
}

impl Gate {
    pub fn check(&self, principal: Option<&Principal>) -> Result<(), &'static str> {
        match self {
            Gate::RequireLogin => match principal {
                Some(p) if p.is_active => Ok(()),
                _ => Err("No permission: You must login"),
            },
            Gate::RequireAdmin => match principal {
                Some(p) if p.is_active && p.is_admin => Ok(()),
                _ => Err("No permission: You must be admin"),
            },
        }
    }
}

/// Evaluate gates in order, stopping at the first rejection
pub fn check_chain(gates: &[Gate], principal: Option<&Principal>) -> Result<(), &'static str> {
    gates.iter().try_for_each(|gate| gate.check(principal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(active: bool, admin: bool) -> Principal {
        Principal {
            id: "u1".to_string(),
            username: "ada".to_string(),
            email: String::new(),
            is_active: active,
            is_admin: admin,
            is_staff: false,
        }
    }

    #[test]
    fn login_requires_active_principal() {
        assert!(Gate::RequireLogin.check(Some(&user(true, false))).is_ok());
        assert_eq!(Gate::RequireLogin.check(Some(&user(false, true))), Err("No permission: You must login"));
        assert_eq!(Gate::RequireLogin.check(None), Err("No permission: You must login"));
    }

    #[test]
    fn admin_requires_active_admin() {
        assert!(Gate::RequireAdmin.check(Some(&user(true, true))).is_ok());
        assert_eq!(Gate::RequireAdmin.check(Some(&user(true, false))), Err("No permission: You must be admin"));
        assert_eq!(Gate::RequireAdmin.check(Some(&user(false, true))), Err("No permission: You must be admin"));
    }

    #[test]
    fn chain_stops_at_first_rejection() {
        let chain = [Gate::RequireLogin, Gate::RequireAdmin];
        assert_eq!(check_chain(&chain, None), Err("No permission: You must login"));
        assert_eq!(check_chain(&chain, Some(&user(true, false))), Err("No permission: You must be admin"));
        assert!(check_chain(&chain, Some(&user(true, true))).is_ok());
        assert!(check_chain(&[], None).is_ok());
    }
}
