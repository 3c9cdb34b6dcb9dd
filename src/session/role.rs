//! Roles and Landing Policy
//!
//! The server declares roles as free-form strings; this module closes them
//! into an enumeration and keeps the landing decision an exhaustive match.

use serde::{Deserialize, Serialize};

use crate::users::User;

/// Account role declared by the server.
///
/// Unknown role strings collapse to [`Role::Member`]: anything that is not
/// an administrative role lands on the public home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Organizer,
    Member,
}

impl Role {
    /// Parse a server role string, case-insensitively.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Role::Admin,
            "ORGANIZER" => Role::Organizer,
            _ => Role::Member,
        }
    }

    /// Canonical wire form
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Organizer => "ORGANIZER",
            Role::Member => "MEMBER",
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Role::parse(&s)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a signed-in (or signed-out) user lands after authentication checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Back-office dashboards
    AdminDashboard,
    /// Public home / front office
    Home,
    /// No session: sign-in page
    SignIn,
}

impl Destination {
    /// Route path for this destination
    pub fn path(&self) -> &'static str {
        match self {
            Destination::AdminDashboard => "/admin",
            Destination::Home => "/",
            Destination::SignIn => "/signin",
        }
    }
}

/// Pure landing policy.
///
/// Administrative roles go to the back office, every other role to the
/// public home, and a missing session or missing role to sign-in.
pub fn landing_destination(user: Option<&User>) -> Destination {
    let Some(user) = user else {
        return Destination::SignIn;
    };

    match user.role {
        Some(Role::Admin) | Some(Role::Organizer) => Destination::AdminDashboard,
        Some(Role::Member) => Destination::Home,
        None => Destination::SignIn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_role(role: Option<Role>) -> User {
        User {
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            avatar: None,
            bio: None,
            role,
            email_verified: false,
            two_factor_enabled: false,
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("Admin"), Role::Admin);
        assert_eq!(Role::parse("ORGANIZER"), Role::Organizer);
        assert_eq!(Role::parse("organizer "), Role::Organizer);
    }

    #[test]
    fn test_unknown_roles_collapse_to_member() {
        assert_eq!(Role::parse("USER"), Role::Member);
        assert_eq!(Role::parse("contestant"), Role::Member);
        assert_eq!(Role::parse(""), Role::Member);
    }

    #[test]
    fn test_admin_lands_on_back_office() {
        let user = user_with_role(Some(Role::Admin));
        assert_eq!(
            landing_destination(Some(&user)),
            Destination::AdminDashboard
        );

        let user = user_with_role(Some(Role::Organizer));
        assert_eq!(
            landing_destination(Some(&user)),
            Destination::AdminDashboard
        );
    }

    #[test]
    fn test_member_lands_on_home() {
        let user = user_with_role(Some(Role::Member));
        assert_eq!(landing_destination(Some(&user)), Destination::Home);
    }

    #[test]
    fn test_missing_session_or_role_lands_on_sign_in() {
        assert_eq!(landing_destination(None), Destination::SignIn);

        let user = user_with_role(None);
        assert_eq!(landing_destination(Some(&user)), Destination::SignIn);
    }

    #[test]
    fn test_destination_paths() {
        assert_eq!(Destination::AdminDashboard.path(), "/admin");
        assert_eq!(Destination::Home.path(), "/");
        assert_eq!(Destination::SignIn.path(), "/signin");
    }
}
