use super::{user::User, Relation, Resource};

/// Opaque session tokens issued at login (`Authorization: Token <value>`)
pub struct Token;

impl Resource for Token {
    const COLLECTION: &'static str = "tokens";
    const NAME: &'static str = "Token";
    const RELATIONS: &'static [Relation] = &[Relation {
        field: "userId",
        collection: User::COLLECTION,
        hidden: User::HIDDEN,
    }];
}
