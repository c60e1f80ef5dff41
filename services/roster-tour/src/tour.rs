use std::sync::Arc;

use anyhow::{Context, Result};
use futures::TryStreamExt;
use tracing::info;
use uuid::Uuid;

use rosterkit::database::ScyllaConnection;
use rosterkit::types::PageSize;

use crate::employees::{Employee, EmployeeRepository};
use crate::messages::{self, Message, MessageRepository};

pub struct Tour {
    conn: Arc<ScyllaConnection>,
    employees: EmployeeRepository,
    messages: MessageRepository,
    page_size: PageSize,
    default_page_size: PageSize,
}

impl Tour {
    pub fn new(conn: Arc<ScyllaConnection>, page_size: PageSize, default_page_size: PageSize) -> Self {
        Self {
            employees: EmployeeRepository::new(conn.clone(), default_page_size),
            messages: MessageRepository::new(conn.clone()),
            conn,
            page_size,
            default_page_size,
        }
    }

    pub async fn run(&self) -> Result<()> {
        self.employee_crud().await?;
        let channel = self.paginate_messages().await?;
        self.null_content(channel).await?;
        info!("Tour complete");
        Ok(())
    }

    async fn employee_crud(&self) -> Result<()> {
        let employee = Employee::new("James", "Bond", 45);
        self.employees
            .insert(&employee)
            .await
            .context("insert employee")?;
        info!("Inserted employee {}", employee.id);

        let stored = self
            .employees
            .get(employee.id)
            .await
            .context("select employee")?
            .with_context(|| format!("employee {} not found after insert", employee.id))?;
        info!("{:?}", stored);

        for (age, last_name) in self
            .employees
            .find_by_age(employee.age)
            .await
            .context("select employees by age")?
        {
            info!("{} {}", age, last_name);
        }

        self.employees
            .update_age_and_first_name(employee.id, 57, "hello")
            .await
            .context("update employee")?;

        let updated = self
            .employees
            .get_age_name(employee.id)
            .await
            .context("select updated employee")?
            .with_context(|| format!("employee {} not found after update", employee.id))?;
        info!("{:?}", updated);

        self.employees
            .delete(employee.id)
            .await
            .context("delete employee")?;
        info!("Deleted employee {}", employee.id);

        Ok(())
    }

    async fn paginate_messages(&self) -> Result<Uuid> {
        let channel = Uuid::new_v4();
        self.messages
            .insert_all(&messages::sample_messages(channel))
            .await
            .context("insert messages")?;
        info!("Inserted sample messages into channel {}", channel);

        let mut pages = Box::pin(messages::pages_by_channel(
            self.conn.as_ref(),
            channel,
            self.page_size,
        ));
        let mut number = 0;
        let mut total = 0;
        while let Some(page) = pages.try_next().await.context("page through messages")? {
            number += 1;
            total += page.rows.len();
            info!("Page {} ({} rows)", number, page.rows.len());
            for (username, content) in &page.rows {
                info!("{} {}", username, content.as_deref().unwrap_or("<null>"));
            }
        }
        info!(
            "Paged through {} messages in {} page(s) of up to {}",
            total,
            number,
            self.page_size.get()
        );

        Ok(channel)
    }

    async fn null_content(&self, channel: Uuid) -> Result<()> {
        self.messages
            .insert(&Message::new(channel, 6, "ming", None))
            .await
            .context("insert message with null content")?;

        let rows = messages::contents(self.conn.as_ref(), channel, self.default_page_size)
            .await
            .context("select message contents")?;
        for (msg_id, content) in rows {
            match content {
                Some(content) => info!("msgID: {}, content: {:?}", msg_id, content),
                None => info!("msgID: {}, Content is null", msg_id),
            }
        }

        Ok(())
    }
}
