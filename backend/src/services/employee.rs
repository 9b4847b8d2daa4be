//! Employee account service

use bcrypt::{hash, DEFAULT_COST};
use serde::{Deserialize, Serialize};
use shared::{codes, Pagination, PaginatedResponse, Role, Status};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::error::{map_unique_violation, AppError, AppResult, Resource};
use crate::repository::{Audit, Entity, Repository};
use crate::services::warehouse::Warehouse;

/// Attempts at drawing a free unique number before giving up
const UNIQUE_NUMBER_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct EmployeeService {
    db: PgPool,
}

/// Employee record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub unique_number: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub warehouse_id: Option<i64>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Entity for Employee {
    const TABLE: &'static str = "employee";
    const COLUMNS: &'static str = "id, first_name, last_name, phone_number, unique_number, \
        password_hash, warehouse_id, role, created_at, updated_at, created_by, updated_by, \
        deleted, status";
}

/// Input for creating an employee
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEmployeeInput {
    #[validate(custom = "crate::validation::generic_name")]
    pub first_name: String,
    #[validate(custom = "crate::validation::generic_name")]
    pub last_name: String,
    #[validate(custom = "crate::validation::phone_number")]
    pub phone_number: String,
    #[validate(custom = "crate::validation::password")]
    pub password: String,
    pub warehouse_id: Option<i64>,
    pub role: Option<Role>,
}

/// Partial employee update
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEmployeeInput {
    #[validate(custom = "crate::validation::generic_name")]
    pub first_name: Option<String>,
    #[validate(custom = "crate::validation::generic_name")]
    pub last_name: Option<String>,
    #[validate(custom = "crate::validation::phone_number")]
    pub phone_number: Option<String>,
    #[validate(custom = "crate::validation::password")]
    pub password: Option<String>,
    pub warehouse_id: Option<i64>,
    pub role: Option<Role>,
}

pub(crate) fn hash_password(password: &str) -> AppResult<String> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

impl EmployeeService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create an employee account
    pub async fn create(&self, input: CreateEmployeeInput, actor: &str) -> AppResult<Employee> {
        input.validate()?;

        if Repository::<Employee>::exists_where(&self.db, "phone_number", &input.phone_number, None)
            .await?
        {
            return Err(AppError::AlreadyExists(Resource::Employee));
        }

        if let Some(warehouse_id) = input.warehouse_id {
            self.ensure_warehouse(warehouse_id).await?;
        }

        let password_hash = hash_password(&input.password)?;
        let unique_number = self.free_unique_number().await?;
        let role = input.role.unwrap_or_default();

        let employee = sqlx::query_as::<_, Employee>(&format!(
            r#"
            INSERT INTO employee
                (first_name, last_name, phone_number, unique_number, password_hash,
                 warehouse_id, role, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {}
            "#,
            Employee::COLUMNS
        ))
        .bind(input.first_name.trim())
        .bind(input.last_name.trim())
        .bind(&input.phone_number)
        .bind(&unique_number)
        .bind(&password_hash)
        .bind(input.warehouse_id)
        .bind(role.as_str())
        .bind(actor)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, Resource::Employee))?;

        tracing::info!(
            employee_id = employee.id,
            role = role.as_str(),
            "Employee created by {}",
            actor
        );
        Ok(employee)
    }

    pub async fn get(&self, id: i64) -> AppResult<Employee> {
        Repository::<Employee>::find_by_id_and_deleted_false(&self.db, id)
            .await?
            .ok_or(AppError::NotFound(Resource::Employee))
    }

    /// Non-deleted employee with this phone number
    pub async fn find_by_phone(&self, phone_number: &str) -> AppResult<Option<Employee>> {
        let employee = sqlx::query_as::<_, Employee>(&format!(
            "SELECT {} FROM employee WHERE phone_number = $1 AND deleted = FALSE",
            Employee::COLUMNS
        ))
        .bind(phone_number)
        .fetch_optional(&self.db)
        .await?;

        Ok(employee)
    }

    pub async fn list(&self, pagination: Pagination) -> AppResult<PaginatedResponse<Employee>> {
        Repository::<Employee>::find_all_not_deleted_paged(&self.db, pagination).await
    }

    /// Partial update; absent fields keep their value
    pub async fn update(
        &self,
        id: i64,
        input: UpdateEmployeeInput,
        actor: &str,
    ) -> AppResult<Employee> {
        input.validate()?;
        let current = self.get(id).await?;

        if let Some(phone) = &input.phone_number {
            if Repository::<Employee>::exists_where(&self.db, "phone_number", phone, Some(id))
                .await?
            {
                return Err(AppError::AlreadyExists(Resource::Employee));
            }
        }

        if let Some(warehouse_id) = input.warehouse_id {
            self.ensure_warehouse(warehouse_id).await?;
        }

        let password_hash = match &input.password {
            Some(password) => hash_password(password)?,
            None => current.password_hash,
        };

        sqlx::query_as::<_, Employee>(&format!(
            r#"
            UPDATE employee
            SET first_name = $2, last_name = $3, phone_number = $4, password_hash = $5,
                warehouse_id = $6, role = $7, updated_by = $8, updated_at = NOW()
            WHERE id = $1 AND deleted = FALSE
            RETURNING {}
            "#,
            Employee::COLUMNS
        ))
        .bind(id)
        .bind(input.first_name.as_deref().map(str::trim).unwrap_or(&current.first_name))
        .bind(input.last_name.as_deref().map(str::trim).unwrap_or(&current.last_name))
        .bind(input.phone_number.as_deref().unwrap_or(&current.phone_number))
        .bind(&password_hash)
        .bind(input.warehouse_id.or(current.warehouse_id))
        .bind(input.role.unwrap_or(current.role).as_str())
        .bind(actor)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, Resource::Employee))?
        .ok_or(AppError::NotFound(Resource::Employee))
    }

    pub async fn delete(&self, id: i64, actor: &str) -> AppResult<()> {
        Repository::<Employee>::trash(&self.db, id, actor)
            .await?
            .ok_or(AppError::NotFound(Resource::Employee))?;
        tracing::info!(employee_id = id, "Employee deleted by {}", actor);
        Ok(())
    }

    pub async fn set_status(&self, id: i64, status: Status, actor: &str) -> AppResult<Employee> {
        Repository::<Employee>::set_status(&self.db, id, status, actor)
            .await?
            .ok_or(AppError::NotFound(Resource::Employee))
    }

    pub async fn admin_exists(&self) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM employee WHERE role = 'ADMIN' AND deleted = FALSE)",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    async fn ensure_warehouse(&self, warehouse_id: i64) -> AppResult<()> {
        Repository::<Warehouse>::find_by_id_and_deleted_false(&self.db, warehouse_id)
            .await?
            .ok_or(AppError::NotFound(Resource::Warehouse))?;
        Ok(())
    }

    async fn free_unique_number(&self) -> AppResult<String> {
        for _ in 0..UNIQUE_NUMBER_ATTEMPTS {
            let candidate = codes::generate_code(&mut rand::thread_rng());
            let taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM employee WHERE unique_number = $1)",
            )
            .bind(&candidate)
            .fetch_one(&self.db)
            .await?;

            if !taken {
                return Ok(candidate);
            }
        }

        Err(AppError::Internal(
            "Could not allocate an employee unique number".to_string(),
        ))
    }
}
