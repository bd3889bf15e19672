//! Persistence of intermediate stage artifacts.

use crate::core::StageKind;
use crate::errors::FileSystemError;
use crate::filesystem::{FileSystem, WriteMode};
use crate::stages::RunState;
use uuid::Uuid;

/// File name under `runs/<run_id>/` for the artifact of `stage`.
#[must_use]
pub const fn artifact_file(stage: StageKind) -> &'static str {
    match stage {
        StageKind::Curation => "knowledge.json",
        StageKind::Outlining => "outline.md",
        StageKind::Drafting => "draft.md",
        StageKind::Polishing => "article.md",
    }
}

/// Relative path of the artifact of `stage` for `run_id`.
#[must_use]
pub fn artifact_path(run_id: Uuid, stage: StageKind) -> String {
    format!("runs/{run_id}/{}", artifact_file(stage))
}

fn render(stage: StageKind, state: &RunState) -> Result<Option<String>, FileSystemError> {
    let rendered = match stage {
        StageKind::Curation => state
            .knowledge()
            .map(serde_json::to_string_pretty)
            .transpose()
            .map_err(|e| FileSystemError::Serialization(e.to_string()))?,
        StageKind::Outlining => state.outline().map(|o| o.render()),
        StageKind::Drafting => state.draft().map(|d| d.render()),
        StageKind::Polishing => state.article().map(|a| a.as_str().to_string()),
    };
    Ok(rendered)
}

/// Writes the artifact `stage` just added to `state`.
///
/// Returns the written path, or `None` if the state holds no such artifact.
pub async fn persist_stage_artifact(
    fs: &dyn FileSystem,
    run_id: Uuid,
    stage: StageKind,
    state: &RunState,
) -> Result<Option<String>, FileSystemError> {
    let Some(contents) = render(stage, state)? else {
        return Ok(None);
    };
    let path = artifact_path(run_id, stage);
    fs.write(&path, &contents, WriteMode::Overwrite).await?;
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Information, KnowledgeBase, Outline, OutlineSection};
    use crate::filesystem::InMemoryFileSystem;
    use crate::stages::test_support;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_artifact_paths() {
        let run_id = Uuid::nil();
        assert_eq!(
            artifact_path(run_id, StageKind::Curation),
            "runs/00000000-0000-0000-0000-000000000000/knowledge.json"
        );
        assert_eq!(artifact_file(StageKind::Polishing), "article.md");
    }

    #[tokio::test]
    async fn test_persist_knowledge_as_json() {
        let fs = InMemoryFileSystem::new();
        let run_id = Uuid::new_v4();
        let state = test_support::state("Rust").with_knowledge(KnowledgeBase::from(vec![
            Information::new("https://example.com/a", vec!["snippet".into()]),
        ]));

        let path = persist_stage_artifact(&fs, run_id, StageKind::Curation, &state)
            .await
            .unwrap()
            .unwrap();

        let written: Vec<Information> =
            serde_json::from_str(&fs.read(&path).await.unwrap()).unwrap();
        assert_eq!(written[0].source_url, "https://example.com/a");
    }

    #[tokio::test]
    async fn test_persist_outline_markdown() {
        let fs = InMemoryFileSystem::new();
        let run_id = Uuid::new_v4();
        let state = test_support::state("Rust").with_outline(Outline::new(vec![
            OutlineSection::new(1, "History"),
            OutlineSection::new(2, "Origins"),
        ]));

        persist_stage_artifact(&fs, run_id, StageKind::Outlining, &state)
            .await
            .unwrap();
        assert_eq!(
            fs.captured().get(&artifact_path(run_id, StageKind::Outlining)),
            Some(&"# History\n## Origins".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_artifact_writes_nothing() {
        let fs = InMemoryFileSystem::new();
        let written = persist_stage_artifact(
            &fs,
            Uuid::new_v4(),
            StageKind::Drafting,
            &test_support::state("Rust"),
        )
        .await
        .unwrap();

        assert!(written.is_none());
        assert!(fs.is_empty());
    }
}
