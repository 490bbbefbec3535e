use async_trait::async_trait;

use super::{fetch_pipeline, snapshot_tree, source_url, storage, write_json};
use crate::config::{FieldKindMap, Settings};
use crate::core::transform::transform_checklists;
use crate::core::ExpansionRule;
use crate::domain::model::RequestDescriptor;
use crate::domain::ports::Job;
use crate::utils::error::Result;

pub const CHECKLIST_DATA_FILE: &str = "checklist-data.json";
pub const CHECKLIST_SUMMARY_FILE: &str = "checklist-summary.json";
pub const FORM_DATA_FILE: &str = "form-data.json";

/// 抓檢查表與其項目,連同每張表的簽名請求,轉成待建立的表單
pub struct FetchChecklistsJob {
    settings: Settings,
}

impl FetchChecklistsJob {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    fn endpoints(&self) -> Vec<RequestDescriptor> {
        let project = &self.settings.source.project_id;
        vec![
            RequestDescriptor::new(
                "lists",
                "project",
                source_url(&self.settings, &format!("/projects/{}/checklist/lists", project)),
            ),
            RequestDescriptor::new(
                "listItems",
                "project",
                source_url(
                    &self.settings,
                    &format!("/projects/{}/checklist/list_items", project),
                ),
            ),
        ]
    }

    fn expansion_rules(&self) -> Result<Vec<ExpansionRule>> {
        Ok(vec![ExpansionRule::new(
            "project",
            "lists",
            "listSignatureRequests",
            "lists",
            &source_url(&self.settings, "/checklist/lists/{id}/signature_requests"),
        )?])
    }

    fn field_kinds(&self) -> Result<FieldKindMap> {
        match &self.settings.field_mapping_file {
            Some(path) => FieldKindMap::from_file(path),
            None => Ok(FieldKindMap::default()),
        }
    }
}

#[async_trait]
impl Job for FetchChecklistsJob {
    fn name(&self) -> &str {
        "fetch-checklists"
    }

    async fn run(&self) -> Result<String> {
        let storage = storage(&self.settings);
        let kinds = self.field_kinds()?;
        let mut pipeline = fetch_pipeline(&self.settings);

        let tree = pipeline
            .run(&self.endpoints(), &self.expansion_rules()?)
            .await?;
        snapshot_tree(&storage, &tree, CHECKLIST_DATA_FILE, CHECKLIST_SUMMARY_FILE).await?;

        let forms = transform_checklists(&tree, &kinds, &self.settings.target);
        tracing::info!("Transformed {} checklists into form entries", forms.len());
        write_json(&storage, FORM_DATA_FILE, &forms).await?;

        Ok(format!("{}/{}", storage.base_path(), FORM_DATA_FILE))
    }
}
