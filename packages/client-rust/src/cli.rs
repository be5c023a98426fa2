//! `cms-admin` command line.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context as _};
use clap::{Args, Parser, Subcommand};
use cms_admin_core::codec::record_id;
use cms_admin_core::context::EngineContext;
use cms_admin_core::display::DisplayCell;
use cms_admin_core::error::{ApiError, FormError, ListError, ModuleError};
use cms_admin_core::field::{FieldDescriptor, FieldType};
use cms_admin_core::form::{FormEngine, SubmitOutcome};
use cms_admin_core::list::ListEngine;
use cms_admin_core::module::{mount_module, ModuleAction, ModuleView};
use cms_admin_core::navigation::Route;
use cms_admin_core::traits::ModuleRegistry;
use cms_admin_core::value::{json_truthy, FieldValue, FileUpload};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use crate::admin::AdminClient;
use crate::config::{
    ClientConfig, ConfigError, ENV_API_BASE_URL, ENV_REQUEST_TIMEOUT_SECS, ENV_STORAGE_BASE_URL,
    ENV_TOKEN_FILE,
};
use crate::notify::TracingNotifier;
use crate::resource::RestClientFactory;

#[derive(Debug, Parser)]
#[command(name = "cms-admin", version, about = "Administer CMS content from the terminal")]
pub struct Cli {
    /// Base URL of the CMS API.
    #[arg(long, env = ENV_API_BASE_URL, global = true)]
    pub api_base_url: Option<String>,
    /// Base URL stored files are served from.
    #[arg(long, env = ENV_STORAGE_BASE_URL, global = true)]
    pub storage_base_url: Option<String>,
    /// File holding the bearer token.
    #[arg(long, env = ENV_TOKEN_FILE, global = true)]
    pub token_file: Option<String>,
    /// Request timeout in seconds.
    #[arg(long, env = ENV_REQUEST_TIMEOUT_SECS, global = true)]
    pub timeout_secs: Option<String>,
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,
    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store a bearer token for later commands.
    LoginToken { token: String },
    /// List built-in and dynamic modules.
    Modules,
    /// Show one page of a module's records.
    List {
        module: String,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Show one record.
    Show { module: String, id: String },
    /// Create a record.
    Create {
        module: String,
        #[command(flatten)]
        edits: EditArgs,
    },
    /// Update a record.
    Update {
        module: String,
        id: String,
        #[command(flatten)]
        edits: EditArgs,
    },
    /// Remove a stored file from a record.
    RemoveFile { module: String, id: String, field: String },
    /// Flip a record's status.
    ToggleStatus { module: String, id: String },
    /// Delete one or more records.
    Delete {
        module: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct EditArgs {
    /// Field value as `name=value`. Collections take comma-separated values.
    #[arg(long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,
    /// File to upload as `name=path`.
    #[arg(long = "file", value_name = "NAME=PATH", value_parser = parse_assignment)]
    pub file: Vec<(String, String)>,
    /// Stay on the record after saving.
    #[arg(long = "continue")]
    pub continue_editing: bool,
}

/// Parses `name=value`.
///
/// # Errors
///
/// Returns a message when `=` is missing or the name is empty.
pub fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing field name in {raw:?}"));
    }
    Ok((name.to_string(), value.to_string()))
}

impl Cli {
    /// Defaults overlaid with the flags and environment clap resolved,
    /// validated the same way as [`ClientConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an empty URL or token path, or a timeout
    /// that is not a whole number of seconds.
    pub fn config(&self) -> Result<ClientConfig, ConfigError> {
        ClientConfig::from_lookup(|var| match var {
            ENV_API_BASE_URL => self.api_base_url.clone(),
            ENV_STORAGE_BASE_URL => self.storage_base_url.clone(),
            ENV_TOKEN_FILE => self.token_file.clone(),
            ENV_REQUEST_TIMEOUT_SECS => self.timeout_secs.clone(),
            _ => None,
        })
    }
}

/// Installs the global subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().flatten_event(true).init();
    } else {
        builder.with_target(false).init();
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

struct Runner {
    admin: AdminClient,
    ctx: EngineContext,
    json: bool,
}

/// Executes one parsed command.
///
/// # Errors
///
/// Any failure of the command, with the redirect hint for expired sessions.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let admin = AdminClient::new(cli.config()?)?;
    let ctx = admin.engine_context(Arc::new(TracingNotifier));
    let runner = Runner {
        admin,
        ctx,
        json: cli.json,
    };
    runner.run(cli.command).await.map_err(explain)
}

fn explain(err: anyhow::Error) -> anyhow::Error {
    if redirect_of(&err) == Some(Route::Login) {
        return err
            .context("session expired; store a new token with `cms-admin login-token <TOKEN>`");
    }
    err
}

fn redirect_of(err: &anyhow::Error) -> Option<Route> {
    if let Some(form) = err.downcast_ref::<FormError>() {
        return form.redirect();
    }
    let api = match err.downcast_ref::<ModuleError>() {
        Some(ModuleError::Form(form)) => return form.redirect(),
        Some(ModuleError::Api(api)) => Some(api),
        _ => match err.downcast_ref::<ListError>() {
            Some(ListError::Api(api)) => Some(api),
            _ => err.downcast_ref::<ApiError>(),
        },
    };
    matches!(api, Some(ApiError::Unauthorized { .. })).then_some(Route::Login)
}

impl Runner {
    async fn run(&self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::LoginToken { token } => {
                let tokens = self.admin.api().tokens();
                tokens
                    .set(&token)
                    .with_context(|| format!("writing {}", tokens.path().display()))?;
                println!("token stored in {}", tokens.path().display());
                Ok(())
            }
            Command::Modules => self.modules().await,
            Command::List { module, search, page } => self.list(&module, &search, page).await,
            Command::Show { module, id } => self.show(&module, id).await,
            Command::Create { module, edits } => {
                let form = self.form(&module, ModuleAction::Create).await?;
                self.edit_and_submit(form, &edits).await
            }
            Command::Update { module, id, edits } => {
                let form = self.form(&module, ModuleAction::Edit(id)).await?;
                self.edit_and_submit(form, &edits).await
            }
            Command::RemoveFile { module, id, field } => {
                let mut form = self.form(&module, ModuleAction::Edit(id)).await?;
                let descriptor = find_field(form.fields(), &field)?;
                if !descriptor.field_type.is_media() {
                    bail!("{field} is not an image or file field");
                }
                form.remove_file(&field);
                self.submit(form, false).await
            }
            Command::ToggleStatus { module, id } => {
                let mut list = self.list_engine(&module).await?;
                let item = list
                    .items()
                    .iter()
                    .find(|item| record_id(item).as_deref() == Some(id.as_str()))
                    .cloned()
                    .ok_or_else(|| anyhow!("no {module} record with id {id}"))?;
                let status = list.toggle_status(&item).await?;
                println!("{module} {id} is now {}", if status { "active" } else { "inactive" });
                Ok(())
            }
            Command::Delete { module, ids } => {
                let mut list = self.list_engine(&module).await?;
                if let [id] = ids.as_slice() {
                    list.delete(id).await?;
                    println!("deleted {module} {id}");
                    return Ok(());
                }
                let report = list.bulk_delete(&ids).await?;
                println!("{}", report.summary());
                for (id, err) in &report.failed {
                    println!("  {id}: {err}");
                }
                if report.failed.is_empty() {
                    Ok(())
                } else {
                    Err(anyhow!(report.summary()))
                }
            }
        }
    }

    async fn mount(&self, module: &str, action: ModuleAction) -> anyhow::Result<ModuleView> {
        let registry = self.admin.registry();
        let clients: RestClientFactory = self.admin.clients();
        Ok(mount_module(&registry, &clients, self.ctx.clone(), module, action).await?)
    }

    async fn form(&self, module: &str, action: ModuleAction) -> anyhow::Result<FormEngine> {
        match self.mount(module, action).await? {
            ModuleView::Form(form) => Ok(form),
            ModuleView::List(_) => bail!("expected a form for {module}"),
        }
    }

    async fn list_engine(&self, module: &str) -> anyhow::Result<ListEngine> {
        match self.mount(module, ModuleAction::List).await? {
            ModuleView::List(list) => Ok(list),
            ModuleView::Form(_) => bail!("expected a list for {module}"),
        }
    }

    async fn modules(&self) -> anyhow::Result<()> {
        let modules = self.admin.registry().list_modules().await?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&modules)?);
            return Ok(());
        }
        for module in modules {
            println!("{:<24} /{:<20} {} fields", module.name, module.route(), module.fields.len());
        }
        Ok(())
    }

    async fn list(&self, module: &str, search: &str, page: usize) -> anyhow::Result<()> {
        let mut list = self.list_engine(module).await?;
        list.filter(search);
        list.set_page(page);
        let rows = list.rows();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }

        let mut header = vec!["id".to_string(), "status".to_string()];
        header.extend(list.columns().iter().map(|f| f.display_label().to_string()));
        println!("{}", header.join(" | "));
        for row in &rows {
            let mut line = vec![
                row.id.clone().unwrap_or_default(),
                DisplayCell::pill(row.status).plain_text(),
            ];
            line.extend(row.cells.iter().map(DisplayCell::plain_text));
            println!("{}", line.join(" | "));
        }
        println!(
            "page {}/{}, {} matching of {}",
            list.page(),
            list.total_pages(),
            list.filtered_items().len(),
            list.items().len()
        );
        Ok(())
    }

    async fn show(&self, module: &str, id: String) -> anyhow::Result<()> {
        let form = self.form(module, ModuleAction::Edit(id)).await?;
        let widgets = form.widgets();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&widgets)?);
            return Ok(());
        }
        println!("status: {}", if form.record().status() { "active" } else { "inactive" });
        for widget in widgets {
            let value = widget.preview.unwrap_or_else(|| widget.value.to_form_string());
            println!("{}: {value}", widget.label);
        }
        Ok(())
    }

    async fn edit_and_submit(&self, mut form: FormEngine, edits: &EditArgs) -> anyhow::Result<()> {
        for (name, raw) in &edits.set {
            if name == cms_admin_core::field::STATUS_FIELD {
                form.set_status(json_truthy(&Value::String(raw.clone())));
                continue;
            }
            let field = find_field(form.fields(), name)?;
            let value = parse_value(field, raw);
            form.set_field(name, value);
        }
        for (name, path) in &edits.file {
            let upload = read_upload(Path::new(path)).await?;
            form.choose_file(name, upload)?;
        }
        self.submit(form, edits.continue_editing).await
    }

    async fn submit(&self, mut form: FormEngine, continue_editing: bool) -> anyhow::Result<()> {
        match form.submit(continue_editing).await? {
            SubmitOutcome::Navigate(route) => println!("saved, next: {}", route.path()),
            SubmitOutcome::Reloaded => {
                println!("saved");
                if self.json {
                    println!("{}", serde_json::to_string_pretty(form.record())?);
                }
            }
        }
        Ok(())
    }
}

fn find_field<'a>(
    fields: &'a [FieldDescriptor],
    name: &str,
) -> anyhow::Result<&'a FieldDescriptor> {
    fields
        .iter()
        .find(|field| field.name == name)
        .ok_or_else(|| anyhow!("unknown field {name:?}"))
}

/// Converts a command-line value to the field's value shape.
#[must_use]
pub fn parse_value(field: &FieldDescriptor, raw: &str) -> FieldValue {
    match field.field_type {
        FieldType::Boolean => FieldValue::Bool(json_truthy(&Value::String(raw.to_string()))),
        FieldType::Multiselect | FieldType::Checkbox => FieldValue::List(
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        _ => FieldValue::text(raw),
    }
}

async fn read_upload(path: &Path) -> anyhow::Result<FileUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{} has no file name", path.display()))?;
    let content_type = mime_guess::from_path(path).first_or_octet_stream().to_string();
    Ok(FileUpload::new(file_name, content_type, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_create_with_edits() {
        let cli = Cli::try_parse_from([
            "cms-admin",
            "--api-base-url",
            "https://cms.test/api",
            "create",
            "news",
            "--set",
            "title=Hello=World",
            "--file",
            "image=./a.png",
            "--continue",
        ])
        .unwrap();

        assert_eq!(cli.config().unwrap().api_base_url, "https://cms.test/api");
        let Command::Create { module, edits } = cli.command else {
            panic!("expected create");
        };
        assert_eq!(module, "news");
        assert_eq!(edits.set, vec![("title".to_string(), "Hello=World".to_string())]);
        assert_eq!(edits.file, vec![("image".to_string(), "./a.png".to_string())]);
        assert!(edits.continue_editing);
    }

    #[test]
    fn config_flags_are_validated() {
        let blank = Cli::try_parse_from(["cms-admin", "--api-base-url", " ", "modules"]).unwrap();
        assert_eq!(
            blank.config().unwrap_err(),
            ConfigError::Empty {
                var: ENV_API_BASE_URL
            }
        );

        let slow = Cli::try_parse_from(["cms-admin", "--timeout-secs", "soon", "modules"]).unwrap();
        assert!(matches!(
            slow.config(),
            Err(ConfigError::InvalidTimeout { ref value, .. }) if value == "soon"
        ));

        let ok = Cli::try_parse_from(["cms-admin", "--timeout-secs", "5", "modules"]).unwrap();
        assert_eq!(ok.config().unwrap().request_timeout, std::time::Duration::from_secs(5));
    }

    #[test]
    fn delete_requires_ids() {
        assert!(Cli::try_parse_from(["cms-admin", "delete", "news"]).is_err());
        let cli = Cli::try_parse_from(["cms-admin", "delete", "news", "1", "2"]).unwrap();
        assert!(matches!(cli.command, Command::Delete { ref ids, .. } if ids.len() == 2));
    }

    #[test]
    fn assignment_needs_name() {
        assert!(parse_assignment("=x").is_err());
        assert!(parse_assignment("novalue").is_err());
        assert_eq!(parse_assignment("a=").unwrap(), ("a".to_string(), String::new()));
    }

    #[test]
    fn unauthorized_errors_point_to_login() {
        let unauthorized = || ApiError::Unauthorized {
            redirect: "/login".into(),
        };
        assert_eq!(redirect_of(&anyhow::Error::new(unauthorized())), Some(Route::Login));
        assert_eq!(
            redirect_of(&anyhow::Error::new(ListError::Api(unauthorized()))),
            Some(Route::Login)
        );
        assert_eq!(
            redirect_of(&anyhow::Error::new(ModuleError::Api(unauthorized()))),
            Some(Route::Login)
        );
        assert_eq!(redirect_of(&anyhow::Error::new(ListError::Busy)), None);

        let explained = explain(anyhow::Error::new(unauthorized()));
        assert!(explained.to_string().contains("login-token"));
    }

    #[test]
    fn values_follow_field_type() {
        let tags = FieldDescriptor::new("tags", "Tags", FieldType::Multiselect);
        assert_eq!(
            parse_value(&tags, "a, b,,c"),
            FieldValue::List(vec!["a".into(), "b".into(), "c".into()])
        );
        let flag = FieldDescriptor::new("on", "On", FieldType::Boolean);
        assert_eq!(parse_value(&flag, "0"), FieldValue::Bool(false));
        assert_eq!(parse_value(&flag, "yes"), FieldValue::Bool(true));
    }
}
