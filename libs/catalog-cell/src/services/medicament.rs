use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::tables::MEDICAMENTS;
use shared_database::{is_conflict, Query, SupabaseClient};
use shared_models::validation::FieldErrors;

use crate::models::{
    display_name, CatalogError, Medicament, MedicamentForm, MedicamentOption, MEDICAMENT_LIST_LIMIT,
};

const SEARCH_COLUMNS: [&str; 3] = ["name", "code", "dci"];

pub struct MedicamentService {
    supabase: SupabaseClient,
}

impl MedicamentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn search(&self, term: Option<&str>) -> Result<Vec<Medicament>, CatalogError> {
        debug!("Searching medicaments for {:?}", term);

        let mut query = Query::table(&MEDICAMENTS).select("*");
        if let Some(term) = term {
            query = query.search(&SEARCH_COLUMNS, term);
        }
        let query = query.order("name.asc").limit(MEDICAMENT_LIST_LIMIT);

        Ok(self.supabase.select(&query).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Medicament, CatalogError> {
        let query = Query::table(&MEDICAMENTS).select("*").eq("id", id);
        self.supabase
            .select_one(&query)
            .await?
            .ok_or(CatalogError::MedicamentNotFound)
    }

    /// Whole catalogue as `"<name> <dosage><unit>"` labels, for prescription lines.
    pub async fn options(&self) -> Result<Vec<MedicamentOption>, CatalogError> {
        #[derive(Deserialize)]
        struct Row {
            id: i64,
            name: Option<String>,
            dosage: Option<String>,
            dosage_unit: Option<String>,
        }

        let query = Query::table(&MEDICAMENTS)
            .select("id,name,dosage,dosage_unit")
            .order("name.asc,id.asc");
        let rows: Vec<Row> = self.supabase.select_all(&query).await?;

        Ok(rows
            .into_iter()
            .map(|row| MedicamentOption {
                id: row.id,
                label: display_name(
                    row.name.as_deref(),
                    row.dosage.as_deref(),
                    row.dosage_unit.as_deref(),
                ),
            })
            .collect())
    }

    pub async fn create(&self, form: &MedicamentForm) -> Result<Medicament, CatalogError> {
        form.validate(true).map_err(CatalogError::Validation)?;
        let id = form.id.ok_or_else(|| id_error("Id is required"))?;

        let taken = self
            .supabase
            .exists(&Query::table(&MEDICAMENTS).eq("id", id))
            .await?;
        if taken {
            return Err(id_error(DUPLICATE_ID));
        }

        let mut row = form.to_row();
        row["id"] = Value::from(id);

        let medicament: Medicament = self
            .supabase
            .insert_one(&MEDICAMENTS, row)
            .await
            .map_err(|e| {
                if is_conflict(&e) {
                    id_error(DUPLICATE_ID)
                } else {
                    CatalogError::Database(e)
                }
            })?;

        info!("Medicament {} created", medicament.id);
        Ok(medicament)
    }

    pub async fn update(&self, id: i64, form: &MedicamentForm) -> Result<Medicament, CatalogError> {
        form.validate(false).map_err(CatalogError::Validation)?;

        let updated: Vec<Medicament> = self
            .supabase
            .update(&Query::table(&MEDICAMENTS).eq("id", id), form.to_row())
            .await?;

        let medicament = updated
            .into_iter()
            .next()
            .ok_or(CatalogError::MedicamentNotFound)?;
        info!("Medicament {} updated", id);
        Ok(medicament)
    }

    pub async fn delete(&self, id: i64) -> Result<(), CatalogError> {
        self.get(id).await?;

        self.supabase
            .delete(&Query::table(&MEDICAMENTS).eq("id", id))
            .await
            .map_err(|e| {
                if is_conflict(&e) {
                    CatalogError::InUse(
                        "This medicament appears on prescriptions and cannot be deleted".to_string(),
                    )
                } else {
                    CatalogError::Database(e)
                }
            })?;

        info!("Medicament {} deleted", id);
        Ok(())
    }
}

const DUPLICATE_ID: &str = "This id already exists";

fn id_error(message: &str) -> CatalogError {
    let mut errors = FieldErrors::new();
    errors.add("id", message);
    CatalogError::Validation(errors)
}
