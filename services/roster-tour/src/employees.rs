use std::sync::Arc;

use futures::TryStreamExt;
use scylla::frame::response::result::CqlValue;
use scylla::FromRow;
use tracing::debug;
use uuid::Uuid;

use rosterkit::database::{scan_as, ScyllaConnection};
use rosterkit::types::{PageSize, QueryDescriptor};
use rosterkit::RosterError;

const INSERT: &str = "INSERT INTO employees (id, firstname, lastname, age) VALUES (?, ?, ?, ?)";
const SELECT_BY_ID: &str = "SELECT id, firstname, lastname, age FROM employees WHERE id = ?";
const SELECT_BY_AGE: &str = "SELECT age, lastname FROM employees WHERE age = ?";
const UPDATE_AGE_AND_FIRST_NAME: &str = "UPDATE employees SET age = ?, firstname = ? WHERE id = ?";
const SELECT_AGE_NAME: &str = "SELECT firstname, age FROM employees WHERE id = ?";
const DELETE: &str = "DELETE FROM employees WHERE id = ?";

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Employee {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub age: i32,
}

impl Employee {
    pub fn new(first_name: &str, last_name: &str, age: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            age,
        }
    }
}

/// Projection used after an update.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AgeName {
    pub first_name: String,
    pub age: i32,
}

pub fn by_age_query(age: i32, page_size: PageSize) -> QueryDescriptor {
    QueryDescriptor::new(SELECT_BY_AGE)
        .bind(CqlValue::Int(age))
        .with_page_size(page_size)
}

pub struct EmployeeRepository {
    conn: Arc<ScyllaConnection>,
    page_size: PageSize,
}

impl EmployeeRepository {
    pub fn new(conn: Arc<ScyllaConnection>, page_size: PageSize) -> Self {
        Self { conn, page_size }
    }

    pub async fn insert(&self, employee: &Employee) -> Result<(), RosterError> {
        debug!("Inserting employee {}", employee.id);
        self.conn
            .execute_with_values(
                INSERT,
                (
                    employee.id,
                    employee.first_name.as_str(),
                    employee.last_name.as_str(),
                    employee.age,
                ),
            )
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Employee>, RosterError> {
        self.conn.query_one::<Employee, _>(SELECT_BY_ID, (id,)).await
    }

    /// `(age, lastname)` of every employee with the given age, read through the paged scan.
    pub async fn find_by_age(&self, age: i32) -> Result<Vec<(i32, String)>, RosterError> {
        scan_as::<_, (i32, String)>(self.conn.as_ref(), by_age_query(age, self.page_size))
            .try_collect()
            .await
    }

    pub async fn update_age_and_first_name(
        &self,
        id: Uuid,
        age: i32,
        first_name: &str,
    ) -> Result<(), RosterError> {
        debug!("Updating employee {}", id);
        self.conn
            .execute_with_values(UPDATE_AGE_AND_FIRST_NAME, (age, first_name, id))
            .await?;
        Ok(())
    }

    pub async fn get_age_name(&self, id: Uuid) -> Result<Option<AgeName>, RosterError> {
        self.conn.query_one::<AgeName, _>(SELECT_AGE_NAME, (id,)).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), RosterError> {
        debug!("Deleting employee {}", id);
        self.conn.execute_with_values(DELETE, (id,)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scylla::frame::response::result::Row;

    #[test]
    fn test_new_employees_get_distinct_ids() {
        let a = Employee::new("James", "Bond", 45);
        let b = Employee::new("James", "Bond", 45);
        assert_ne!(a.id, b.id);
        assert_eq!(a.age, 45);
    }

    #[test]
    fn test_employee_decodes_in_select_order() {
        let id = Uuid::new_v4();
        let row = Row {
            columns: vec![
                Some(CqlValue::Uuid(id)),
                Some(CqlValue::Text("James".to_string())),
                Some(CqlValue::Text("Bond".to_string())),
                Some(CqlValue::Int(45)),
            ],
        };
        let employee: Employee = row.into_typed().unwrap();
        assert_eq!(
            employee,
            Employee {
                id,
                first_name: "James".to_string(),
                last_name: "Bond".to_string(),
                age: 45,
            }
        );
    }

    #[test]
    fn test_age_name_rejects_wrong_column_count() {
        let row = Row {
            columns: vec![Some(CqlValue::Text("hello".to_string()))],
        };
        let err = row.into_typed::<AgeName>().map_err(RosterError::from).unwrap_err();
        assert!(matches!(err, RosterError::DecodeError(_)));
    }

    #[test]
    fn test_by_age_query_binds_the_age() {
        let query = by_age_query(45, PageSize::new(10).unwrap());
        assert_eq!(query.statement, SELECT_BY_AGE);
        assert_eq!(query.params, vec![Some(CqlValue::Int(45))]);
        assert_eq!(query.page_size.get(), 10);
    }
}
