/// Role claim read from the profile store. Only `"admin"` grants the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    pub fn from_claim(claim: Option<&str>) -> Self {
        match claim {
            Some("admin") => Role::Admin,
            _ => Role::Customer,
        }
    }
}

/// The authenticated actor, passed explicitly to everything that needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub owner_id: String,
    pub role: Role,
}

impl Session {
    pub fn customer(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            role: Role::Customer,
        }
    }

    pub fn admin(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
