use mathwrks_core::model::{Concept, ConceptId, Module, ModuleId, NewConcept, NewModule};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db_err, map_concept_row, map_module_row, ser};
use crate::repository::{CatalogRepository, ConceptListing, StorageError};

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn insert_module(&self, module: NewModule) -> Result<Module, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO modules (name, display_name, description, icon)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(&module.name)
        .bind(&module.display_name)
        .bind(&module.description)
        .bind(&module.icon)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(Module {
            id: ModuleId::new(res.last_insert_rowid()),
            name: module.name,
            display_name: module.display_name,
            description: module.description,
            icon: module.icon,
        })
    }

    async fn list_modules(&self) -> Result<Vec<Module>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, display_name, description, icon
            FROM modules
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_module_row).collect()
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, display_name, description, icon
            FROM modules WHERE id = ?1
            ",
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_module_row).transpose()
    }

    async fn insert_concept(&self, concept: NewConcept) -> Result<Concept, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO concepts (module_id, name, explanation)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(concept.module_id.value())
        .bind(&concept.name)
        .bind(&concept.explanation)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(Concept {
            id: ConceptId::new(res.last_insert_rowid()),
            module_id: concept.module_id,
            name: concept.name,
            explanation: concept.explanation,
        })
    }

    async fn get_concept(&self, id: ConceptId) -> Result<Option<Concept>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, module_id, name, explanation
            FROM concepts WHERE id = ?1
            ",
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_concept_row).transpose()
    }

    async fn list_concepts(&self) -> Result<Vec<ConceptListing>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT c.id, c.module_id, c.name, c.explanation, m.display_name AS module_name
            FROM concepts c
            JOIN modules m ON c.module_id = m.id
            ORDER BY c.module_id ASC, c.id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(ConceptListing {
                concept: map_concept_row(&row)?,
                module_name: row.try_get("module_name").map_err(ser)?,
            });
        }
        Ok(out)
    }
}
