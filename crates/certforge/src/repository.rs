//! Template repository abstraction.
//!
//! Template metadata persistence is a collaborator concern; the core
//! only defines the interface and ships an in-memory implementation as
//! the test/dev backing store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{CertforgeError, Result, StorageError, TemplateError};
use crate::storage::{StorageGateway, bucket};
use crate::template::{Template, TemplateId};

/// Storage trait for template metadata persistence
#[async_trait]
pub trait TemplateRepository: Send + Sync + 'static {
    /// Save (or overwrite) a template
    async fn save(&self, template: &Template) -> Result<()>;

    /// Get a template by ID
    async fn get(&self, id: &TemplateId) -> Result<Template>;

    /// List all templates
    async fn list(&self) -> Result<Vec<Template>>;

    /// Delete a template
    async fn delete(&self, id: &TemplateId) -> Result<()>;
}

/// In-memory repository for tests and development
#[derive(Debug, Default)]
pub struct MemoryTemplateRepository {
    templates: Mutex<HashMap<TemplateId, Template>>,
}

impl MemoryTemplateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateRepository for MemoryTemplateRepository {
    async fn save(&self, template: &Template) -> Result<()> {
        let mut templates = self
            .templates
            .lock()
            .map_err(|_| CertforgeError::Storage(StorageError::Backend("Lock poisoned".into())))?;
        templates.insert(template.id.clone(), template.clone());
        Ok(())
    }

    async fn get(&self, id: &TemplateId) -> Result<Template> {
        let templates = self
            .templates
            .lock()
            .map_err(|_| CertforgeError::Storage(StorageError::Backend("Lock poisoned".into())))?;
        templates
            .get(id)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound { id: id.0.clone() }.into())
    }

    async fn list(&self) -> Result<Vec<Template>> {
        let templates = self
            .templates
            .lock()
            .map_err(|_| CertforgeError::Storage(StorageError::Backend("Lock poisoned".into())))?;
        let mut all: Vec<Template> = templates.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn delete(&self, id: &TemplateId) -> Result<()> {
        let mut templates = self
            .templates
            .lock()
            .map_err(|_| CertforgeError::Storage(StorageError::Backend("Lock poisoned".into())))?;
        templates.remove(id);
        Ok(())
    }
}

/// Delete a template together with its backing document in the
/// templates bucket.
pub async fn delete_template(
    repository: &dyn TemplateRepository,
    storage: &dyn StorageGateway,
    id: &TemplateId,
) -> Result<()> {
    let template = repository.get(id).await?;
    storage
        .delete(bucket::TEMPLATES, &template.source_file)
        .await?;
    repository.delete(id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn template(id: &str) -> Template {
        let now = time::OffsetDateTime::now_utc();
        Template {
            id: id.into(),
            name: format!("Template {id}"),
            source_file: format!("{id}.pdf"),
            page_count: 1,
            page_width: 612.0,
            page_height: 792.0,
            attributes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn save_get_list_delete() {
        let repo = MemoryTemplateRepository::new();
        repo.save(&template("a")).await.unwrap();
        repo.save(&template("b")).await.unwrap();

        let got = repo.get(&"a".into()).await.unwrap();
        assert_eq!(got.name, "Template a");

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "a".into());

        repo.delete(&"a".into()).await.unwrap();
        assert!(repo.get(&"a".into()).await.is_err());
    }

    #[tokio::test]
    async fn delete_template_removes_backing_file() {
        let repo = MemoryTemplateRepository::new();
        let storage = MemoryStorage::new();

        storage
            .save(bucket::TEMPLATES, "a.pdf", b"pdf".to_vec())
            .await
            .unwrap();
        repo.save(&template("a")).await.unwrap();

        delete_template(&repo, &storage, &"a".into()).await.unwrap();

        assert!(repo.get(&"a".into()).await.is_err());
        assert!(!storage.exists(bucket::TEMPLATES, "a.pdf").await.unwrap());
    }
}
