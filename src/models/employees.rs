// src/models/employees.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::common::validation::not_blank;
use crate::models::{Collection, Patchable, Record, dashboard::DashboardData};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewEmployee {
    #[validate(custom(function = "not_blank", message = "O nome do funcionário é obrigatório."))]
    pub name: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeePatch {
    pub name: Option<String>,
    pub role: Option<String>,
}

impl Patchable<Employee> for EmployeePatch {
    fn apply(&self, employee: &mut Employee) {
        if let Some(name) = &self.name {
            employee.name = name.clone();
        }
        if let Some(role) = &self.role {
            employee.role = role.clone();
        }
    }

    fn revert(&self, employee: &mut Employee, snapshot: &Employee) {
        if self.name.is_some() {
            employee.name = snapshot.name.clone();
        }
        if self.role.is_some() {
            employee.role = snapshot.role.clone();
        }
    }
}

impl Record for Employee {
    type New = NewEmployee;
    type Patch = EmployeePatch;

    const COLLECTION: Collection = Collection::Employees;

    fn id(&self) -> Uuid {
        self.id
    }

    fn rows(data: &DashboardData) -> &Vec<Self> {
        &data.employees
    }

    fn rows_mut(data: &mut DashboardData) -> &mut Vec<Self> {
        &mut data.employees
    }
}
