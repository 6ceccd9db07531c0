use clap::{Args, Parser, Subcommand, ValueEnum};

use chamberlain_core::model::SchemeStatus;

#[derive(Parser, Debug, Clone)]
#[command(name = "chamberlain", version, about = "Chamberlain scene and config manager")]
pub struct Cli {
    /// Emit JSON output on stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Store root directory (default: .chamberlain)
    #[arg(long, global = true, default_value = ".chamberlain")]
    pub store_root: String,

    /// JSON file with paging, policy and capability settings.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Log filter (e.g. `info`, `chamberlain_store=debug`). Overrides RUST_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create, inspect and edit scenes.
    #[command(subcommand)]
    Scene(SceneCmd),

    /// Manage a scene's scheme versions.
    #[command(subcommand)]
    Scheme(SchemeCmd),

    /// Create, inspect and edit configs.
    #[command(subcommand)]
    Config(ConfigCmd),

    /// Print the capabilities advertised to collaborators.
    Capabilities,
}

/// Paging and ordering flags shared by list commands.
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Case-insensitive search term.
    #[arg(long)]
    pub keyword: Option<String>,

    /// Sort rules, e.g. `createdAt:desc,id:asc`.
    #[arg(long)]
    pub sort: Option<String>,

    /// 1-indexed page number.
    #[arg(long)]
    pub page: Option<usize>,

    #[arg(long)]
    pub page_size: Option<usize>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SceneCmd {
    Create {
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Initial JSON Schema (inline JSON or @file).
        #[arg(long)]
        scheme: String,
        /// Available conditions as a JSON array (inline or @file).
        #[arg(long)]
        conditions: Option<String>,
    },
    Get {
        id: String,
    },
    List {
        #[command(flatten)]
        list: ListArgs,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Full desired condition catalog as a JSON array (inline or @file).
        #[arg(long)]
        conditions: Option<String>,
    },
    Delete {
        id: String,
    },
    /// Append one condition definition.
    AddCondition {
        id: String,
        #[arg(long)]
        key: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Value type hint (string, number, enum, ...).
        #[arg(long = "type")]
        value_type: Option<String>,
        /// Allowed values, comma separated.
        #[arg(long, value_delimiter = ',')]
        values: Option<Vec<String>>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SchemeCmd {
    /// Dry-run compatibility check against the active version.
    Validate {
        scene_id: String,
        #[arg(long)]
        scheme: String,
    },
    /// Append a new active version.
    Update {
        scene_id: String,
        #[arg(long)]
        scheme: String,
        /// Accept compatibility warnings.
        #[arg(long)]
        overwrite: bool,
        #[arg(long = "description")]
        change_description: Option<String>,
    },
    /// Set one version's status.
    Status {
        scene_id: String,
        #[arg(value_name = "VERSION")]
        number: u32,
        #[arg(value_enum)]
        status: StatusArg,
    },
    /// List versions, newest first.
    List {
        scene_id: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum StatusArg {
    Active,
    Inactive,
}

impl From<StatusArg> for SchemeStatus {
    fn from(s: StatusArg) -> Self {
        match s {
            StatusArg::Active => SchemeStatus::Active,
            StatusArg::Inactive => SchemeStatus::Inactive,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCmd {
    Create {
        scene_id: String,
        /// Scheme version (default: the active one).
        #[arg(long)]
        scheme_version: Option<u32>,
        /// Conditions as `key:value,key:value`.
        #[arg(long)]
        conditions: Option<String>,
        /// Payload (inline JSON or @file).
        #[arg(long)]
        data: String,
    },
    Get {
        id: String,
    },
    /// Look up a config by its scene and exact conditions.
    Find {
        scene_id: String,
        #[arg(long)]
        conditions: Option<String>,
    },
    List {
        scene_id: String,
        #[arg(long)]
        scheme_version: Option<u32>,
        /// Subset filter as `key:value,key:value`.
        #[arg(long)]
        conditions: Option<String>,
        #[command(flatten)]
        list: ListArgs,
    },
    Update {
        id: String,
        #[arg(long)]
        scheme_version: Option<u32>,
        #[arg(long)]
        data: Option<String>,
    },
    /// Copy a config to a new condition set.
    Copy {
        id: String,
        #[arg(long)]
        to: Option<String>,
    },
    Delete {
        id: String,
    },
    /// Validate a payload without storing it.
    Validate {
        scene_id: String,
        #[arg(long)]
        scheme_version: Option<u32>,
        #[arg(long)]
        data: String,
    },
}
