use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityBase;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    #[serde(flatten)]
    pub base: EntityBase,
    pub name: String,
    pub description: Option<String>,
    pub head: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewDepartment {
    pub name: String,
    pub description: Option<String>,
    pub head: Option<String>,
}

impl NewDepartment {
    pub fn into_department(self) -> Department {
        Department {
            base: EntityBase::new(),
            name: self.name,
            description: self.description,
            head: self.head,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    #[serde(flatten)]
    pub base: EntityBase,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewRole {
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

impl NewRole {
    pub fn into_role(self) -> Role {
        Role {
            base: EntityBase::new(),
            name: self.name,
            description: self.description,
            permissions: self.permissions,
        }
    }
}

/// A person allowed to sign on behalf of the organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authorizer {
    #[serde(flatten)]
    pub base: EntityBase,
    pub name: String,
    pub email: String,
    pub department_id: Option<Uuid>,
    /// Highest document amount this authorizer may sign, if limited.
    pub signing_limit: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewAuthorizer {
    pub name: String,
    pub email: String,
    pub department_id: Option<Uuid>,
    pub signing_limit: Option<f64>,
}

impl NewAuthorizer {
    pub fn into_authorizer(self) -> Authorizer {
        Authorizer {
            base: EntityBase::new(),
            name: self.name,
            email: self.email,
            department_id: self.department_id,
            signing_limit: self.signing_limit,
        }
    }
}
