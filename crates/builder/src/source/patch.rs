//! Patch application and source edits

use crate::environment::BuildEnvironment;
use crate::options::OptionSet;
use crate::recipe::model::{holds, PatchSpec, SourceEdit};
use crate::utils::fileops::join_within;
use kiln_errors::{AcquisitionError, BuildError, Error};
use kiln_events::{EventEmitter, SourceChange};
use kiln_types::Settings;
use std::path::Path;

/// Apply patches in order with `patch -p1`
///
/// Patch files are resolved against `recipe_dir`.
///
/// # Errors
///
/// Returns `AcquisitionError::MissingPatch` for a patch file that does not
/// exist and `AcquisitionError::PatchFailed` when `patch` rejects a patch.
pub async fn apply_patches(
    env: &BuildEnvironment,
    patches: &[PatchSpec],
    recipe_dir: &Path,
    source_dir: &Path,
) -> Result<usize, Error> {
    for patch in patches {
        let patch_path = recipe_dir.join(&patch.patch_file);
        if !patch_path.is_file() {
            return Err(AcquisitionError::MissingPatch {
                path: patch_path.display().to_string(),
            }
            .into());
        }

        let patch_arg = patch_path.display().to_string();
        let result = env
            .execute_command(
                "patch",
                &["-p1", "--batch", "--forward", "-i", &patch_arg],
                Some(source_dir),
            )
            .await?;

        if !result.success {
            return Err(AcquisitionError::PatchFailed {
                patch: patch.patch_file.clone(),
                message: result.failure_output().to_string(),
            }
            .into());
        }

        env.emit_source_changed(
            env.session_id(),
            env.package(),
            SourceChange::Patch,
            patch.patch_file.clone(),
            patch.patch_description.clone(),
        );
    }

    Ok(patches.len())
}

/// Apply the matching source edits to files under `source_dir`
///
/// Every occurrence of `search` is replaced.
///
/// # Errors
///
/// Returns `BuildError::RecipeError` for a file outside `source_dir`,
/// `BuildError::SourceEdit` when the search text does not occur in the
/// file, or an I/O error if the file cannot be read or written.
pub async fn apply_source_edits(
    env: &BuildEnvironment,
    edits: &[SourceEdit],
    source_dir: &Path,
    settings: &Settings,
    options: &OptionSet,
) -> Result<usize, Error> {
    let mut applied = 0;
    for edit in edits
        .iter()
        .filter(|edit| holds(edit.when.as_ref(), settings, options))
    {
        let path = join_within(source_dir, &edit.file).ok_or_else(|| BuildError::RecipeError {
            message: format!("source edit target {} leaves the source folder", edit.file),
        })?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::io_with_path(&e, &path))?;

        if !content.contains(&edit.search) {
            return Err(BuildError::SourceEdit {
                file: edit.file.clone(),
                search: edit.search.clone(),
            }
            .into());
        }

        tokio::fs::write(&path, content.replace(&edit.search, &edit.replace))
            .await
            .map_err(|e| Error::io_with_path(&e, &path))?;
        env.emit_source_changed(
            env.session_id(),
            env.package(),
            SourceChange::Edit,
            edit.file.clone(),
            None,
        );
        applied += 1;
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::model::Condition;
    use kiln_events::{AppEvent, BuildEvent};
    use kiln_types::CompilerKind;

    fn settings(compiler: &str, version: &str) -> Settings {
        let mut builder = Settings::builder();
        builder
            .set("os", "Windows")
            .unwrap()
            .set("arch", "x86_64")
            .unwrap()
            .set("compiler", compiler)
            .unwrap()
            .set("compiler.version", version)
            .unwrap();
        builder.build().unwrap()
    }

    fn msvc_edit(search: &str) -> SourceEdit {
        SourceEdit {
            file: "meson.build".to_string(),
            search: search.to_string(),
            replace: "cpp_std=vc++".to_string(),
            when: Some(Condition {
                compiler: Some(CompilerKind::Msvc),
                ..Condition::default()
            }),
        }
    }

    #[tokio::test]
    async fn test_source_edit_applies_only_when_condition_holds() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("meson.build");
        std::fs::write(&file, "project('x', default_options: ['cpp_std=c++17'])\n").unwrap();
        let edits = [msvc_edit("cpp_std=c++")];
        let (tx, mut rx) = kiln_events::channel();
        let env = BuildEnvironment::new("session", "demo/1.0").with_event_sender(Some(tx));

        let applied = apply_source_edits(
            &env,
            &edits,
            temp.path(),
            &settings("gcc", "13"),
            &OptionSet::default(),
        )
        .await
        .unwrap();
        assert_eq!(applied, 0);
        assert!(rx.try_recv().is_err());

        let applied = apply_source_edits(
            &env,
            &edits,
            temp.path(),
            &settings("msvc", "193"),
            &OptionSet::default(),
        )
        .await
        .unwrap();
        assert_eq!(applied, 1);
        match rx.try_recv().unwrap() {
            AppEvent::Build(BuildEvent::SourceChanged { change, target, .. }) => {
                assert_eq!(change, SourceChange::Edit);
                assert_eq!(target, "meson.build");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(std::fs::read_to_string(&file)
            .unwrap()
            .contains("'cpp_std=vc++17'"));
    }

    #[tokio::test]
    async fn test_source_edit_missing_search_text() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("meson.build"), "project('x')\n").unwrap();

        let env = BuildEnvironment::new("session", "demo/1.0");
        let err = apply_source_edits(
            &env,
            &[msvc_edit("cpp_std=c++")],
            temp.path(),
            &settings("msvc", "193"),
            &OptionSet::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Build(BuildError::SourceEdit { .. })));
    }

    #[tokio::test]
    async fn test_source_edit_outside_source_folder_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let source_dir = temp.path().join("src");
        std::fs::create_dir_all(&source_dir).unwrap();
        let outside = temp.path().join("victim.txt");
        std::fs::write(&outside, "cpp_std=c++17\n").unwrap();

        let mut edit = msvc_edit("cpp_std=c++");
        edit.file = "../victim.txt".to_string();
        let env = BuildEnvironment::new("session", "demo/1.0");
        let err = apply_source_edits(
            &env,
            &[edit],
            &source_dir,
            &settings("msvc", "193"),
            &OptionSet::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Build(BuildError::RecipeError { .. })));
        assert_eq!(std::fs::read_to_string(&outside).unwrap(), "cpp_std=c++17\n");
    }

    #[tokio::test]
    async fn test_missing_patch_file() {
        let temp = tempfile::tempdir().unwrap();
        let env = BuildEnvironment::new("session", "demo/1.0");
        let patches = [PatchSpec {
            patch_file: "patches/0001-missing.patch".to_string(),
            patch_description: None,
            patch_type: None,
        }];

        let err = apply_patches(&env, &patches, temp.path(), temp.path())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Acquisition(AcquisitionError::MissingPatch { .. })
        ));
    }
}
