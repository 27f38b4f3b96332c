//! Command dispatch: one function per subcommand

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::application::services::PasteOutcome;
use crate::application::{ApplicationError, OpenedFile};
use crate::cli::args::{Cli, Commands, ConfigCommands, JournalCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::domain::{DomainError, NodeId};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage("no command given, see --help".to_string()));
    };

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(db) = &cli.db {
        settings.db_path = db.clone();
    }

    match command {
        Commands::Config { command } => return cmd_config(command, &settings),
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let container = ServiceContainer::open(settings)?;
    run(&container, command)
}

/// Commands that need the store.
pub fn run(container: &ServiceContainer, command: &Commands) -> CliResult<()> {
    match command {
        Commands::Ls { parent } => cmd_ls(container, parent.unwrap_or(NodeId::ROOT)),
        Commands::Tree => cmd_tree(container),
        Commands::Mkdir { name, parent } => cmd_create(container, *parent, name, true),
        Commands::New { name, parent } => cmd_create(container, *parent, name, false),
        Commands::Rename { id, name } => {
            container.tree().rename(*id, name)?;
            output::success(&format!("Renamed {} to {}", id, name));
            Ok(())
        }
        Commands::Mv { id, target } => cmd_paste(container, *id, *target, true),
        Commands::Cp { id, target } => cmd_paste(container, *id, *target, false),
        Commands::Rm { id } => cmd_rm(container, *id),
        Commands::Cat {
            id,
            decrypt,
            password,
        } => cmd_cat(container, *id, *decrypt, password.as_deref()),
        Commands::Write { id, file } => cmd_write(container, *id, file.as_deref()),
        Commands::Import { path, parent, name } => {
            cmd_import(container, path, *parent, name.as_deref())
        }
        Commands::Export { id, output } => cmd_export(container, *id, output.as_deref()),
        Commands::Find { query } => cmd_find(container, query),
        Commands::Encrypt { id, password } => {
            let password = resolve_password(password.as_deref(), true)?;
            container.session().encrypt(*id, &password)?;
            output::success(&format!("Encrypted {}", id));
            Ok(())
        }
        Commands::Decrypt { id, password } => {
            let password = resolve_password(password.as_deref(), false)?;
            container.session().decrypt(*id, &password)?;
            output::success(&format!("Decrypted {}", id));
            Ok(())
        }
        Commands::Journal { command } => cmd_journal(container, command),
        Commands::Clear { yes } => {
            if !yes {
                return Err(CliError::Usage(
                    "clear deletes every note; pass --yes to confirm".to_string(),
                ));
            }
            container.session().clear_all()?;
            output::success("Database cleared");
            Ok(())
        }
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}

#[instrument(level = "debug", skip(container))]
fn cmd_ls(container: &ServiceContainer, parent: NodeId) -> CliResult<()> {
    for node in container.tree().list_children(parent)? {
        output::info(&output::node_line(&node));
    }
    Ok(())
}

fn cmd_tree(container: &ServiceContainer) -> CliResult<()> {
    let nodes = container.tree().walk()?;
    debug!("cmd_tree: {} nodes", nodes.len());
    output::info(&output::render_tree(&nodes, output::node_line));
    Ok(())
}

fn cmd_create(container: &ServiceContainer, parent: NodeId, name: &str, is_folder: bool) -> CliResult<()> {
    let id = container.session().create(parent, name, is_folder)?;
    let node = container.tree().get(id)?;
    output::action("Created", &output::node_line(&node));
    Ok(())
}

/// `mv` and `cp` go through the clipboard so they follow the same rules as
/// an interactive cut/copy + paste.
fn cmd_paste(container: &ServiceContainer, id: NodeId, target: NodeId, cut: bool) -> CliResult<()> {
    let mut session = container.session();
    if cut {
        session.cut(id)?;
    } else {
        session.copy(id)?;
    }
    match session.paste(target)? {
        Some(PasteOutcome::Moved(moved)) => {
            output::success(&format!("Moved {} into {}", moved, target));
        }
        Some(PasteOutcome::Copied { source, copy }) => {
            let node = container.tree().get(copy)?;
            output::success(&format!("Copied {} into {}", source, target));
            output::detail(&output::node_line(&node));
        }
        None => output::warning("nothing to paste"),
    }
    Ok(())
}

fn cmd_rm(container: &ServiceContainer, id: NodeId) -> CliResult<()> {
    let removed = container.session().delete(id)?;
    if removed.is_empty() {
        output::warning(&format!("{} does not exist", id));
    } else {
        output::success(&format!("Removed {} node(s)", removed.len()));
    }
    Ok(())
}

fn cmd_cat(container: &ServiceContainer, id: NodeId, decrypt: bool, password: Option<&str>) -> CliResult<()> {
    let mut session = container.session();
    match session.open_file(id)? {
        OpenedFile::Editable(content) => output::info(&content),
        OpenedFile::Locked if decrypt => {
            let password = resolve_password(password, false)?;
            output::info(&container.vault().peek_node(id, &password)?);
        }
        OpenedFile::Locked => {
            return Err(ApplicationError::from(DomainError::ContentLocked(id)).into());
        }
    }
    Ok(())
}

/// Saves through a session so the write lands in undo history and the journal.
fn cmd_write(container: &ServiceContainer, id: NodeId, file: Option<&Path>) -> CliResult<()> {
    let content = match file {
        Some(path) => read_file(path)?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| InfraError::io("read stdin", e))?;
            buf
        }
    };
    let mut session = container.session();
    session.open_file(id)?;
    session.edit(&content, Instant::now())?;
    let written = session.flush()?;
    session.close_file()?;
    debug!("cmd_write: {} save(s) applied", written);
    output::success(&format!("Saved {} ({} bytes)", id, content.len()));
    Ok(())
}

fn cmd_import(container: &ServiceContainer, path: &Path, parent: NodeId, name: Option<&str>) -> CliResult<()> {
    let content = read_file(path)?;
    let name = match name {
        Some(n) => n.to_string(),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CliError::InvalidArgs(format!("no file name in {}", path.display())))?,
    };
    let id = container.tree().import_file(parent, &name, &content)?;
    output::action("Imported", &format!("{} as {}", path.display(), id));
    Ok(())
}

fn cmd_export(container: &ServiceContainer, id: NodeId, output_path: Option<&Path>) -> CliResult<()> {
    let (name, content) = container.tree().export_file(id)?;
    let target = export_target(output_path, &name);
    std::fs::write(&target, content)
        .map_err(|e| InfraError::io(format!("write {}", target.display()), e))?;
    output::action("Exported", &target.display());
    Ok(())
}

/// Directories (and no path at all) receive the file under its own name.
fn export_target(output_path: Option<&Path>, name: &str) -> PathBuf {
    match output_path {
        Some(path) if path.is_dir() => path.join(name),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(name),
    }
}

fn cmd_find(container: &ServiceContainer, query: &str) -> CliResult<()> {
    let tree = container.tree();
    let hits = tree.search(query)?;
    if hits.is_empty() {
        output::warning(&format!("no match for {:?}", query));
    }
    for node in hits {
        let mut path: Vec<String> = Vec::new();
        for ancestor in tree.ancestors(node.id)?.into_iter().rev() {
            path.push(tree.get(ancestor)?.name);
        }
        output::info(&output::node_line(&node));
        if !path.is_empty() {
            output::detail(&format!("in /{}", path.join("/")));
        }
    }
    Ok(())
}

fn cmd_journal(container: &ServiceContainer, command: &JournalCommands) -> CliResult<()> {
    let journal = container.journal();
    match command {
        JournalCommands::Export { output: None } => output::info(&journal.export_json()?),
        JournalCommands::Export { output: Some(path) } => {
            std::fs::write(path, journal.export_json()?)
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::action("Exported", &path.display());
        }
        JournalCommands::Prune => {
            let removed = journal.prune_expired(Utc::now())?;
            output::success(&format!("Pruned {} journal entries", removed));
        }
    }
    Ok(())
}

fn cmd_config(command: &ConfigCommands, settings: &Settings) -> CliResult<()> {
    match command {
        ConfigCommands::Show => output::info(&settings.to_toml()?),
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => match global_config_path() {
            Some(path) => output::info(&path.display()),
            None => output::warning("no config directory on this platform"),
        },
    }
    Ok(())
}

fn read_file(path: &Path) -> CliResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| InfraError::io(format!("read {}", path.display()), e).into())
}

/// Password from the flag/env, else prompted; encryption asks twice.
fn resolve_password(given: Option<&str>, confirm: bool) -> CliResult<Zeroizing<String>> {
    let password = match given {
        Some(p) => Zeroizing::new(p.to_string()),
        None => {
            let first = Zeroizing::new(
                rpassword::prompt_password("Password: ")
                    .map_err(|e| InfraError::io("read password", e))?,
            );
            if confirm {
                let second = Zeroizing::new(
                    rpassword::prompt_password("Repeat password: ")
                        .map_err(|e| InfraError::io("read password", e))?,
                );
                if *first != *second {
                    return Err(CliError::InvalidArgs("passwords do not match".to_string()));
                }
            }
            first
        }
    };
    if password.is_empty() {
        return Err(CliError::InvalidArgs("password must not be empty".to_string()));
    }
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::MemoryNodeStore;
    use std::sync::Arc;

    fn container() -> ServiceContainer {
        let store = Arc::new(MemoryNodeStore::new());
        ServiceContainer::with_deps(Settings::default(), store.clone(), store)
    }

    #[test]
    fn given_folder_target_when_exporting_then_file_keeps_its_name() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(export_target(Some(dir.path()), "a.txt"), dir.path().join("a.txt"));
        assert_eq!(export_target(None, "a.txt"), PathBuf::from("a.txt"));
    }

    #[test]
    fn given_mv_into_own_child_when_run_then_cycle_error_and_tree_unchanged() {
        let c = container();
        let a = c.tree().create(NodeId::ROOT, "A", true).unwrap();
        let b = c.tree().create(a, "B", true).unwrap();

        let err = run(&c, &Commands::Mv { id: a, target: b }).unwrap_err();

        assert_eq!(err.exit_code(), crate::exitcode::DATAERR);
        assert_eq!(c.tree().get(a).unwrap().parent_id, NodeId::ROOT);
    }

    #[test]
    fn given_empty_password_when_resolved_then_invalid_args() {
        assert!(matches!(
            resolve_password(Some(""), false),
            Err(CliError::InvalidArgs(_))
        ));
    }
}
