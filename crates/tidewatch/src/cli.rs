//! Clap derive structures for the `tidewatch` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tidewatch -- console for buoy fleets, firmware, and telemetry
#[derive(Debug, Parser)]
#[command(
    name = "tidewatch",
    version,
    about = "Manage tidewatch device fleets and telemetry from the command line",
    long_about = "Administer users, roles, menus, device models, devices and firmware,\n\
        and browse or stream device telemetry from a tidewatch deployment.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Deployment profile to use
    #[arg(long, short = 'p', env = "TIDEWATCH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Auth center URL (overrides profile)
    #[arg(long, env = "TIDEWATCH_AUTH_CENTER", global = true)]
    pub auth_center: Option<String>,

    /// Data center URL (overrides profile)
    #[arg(long, env = "TIDEWATCH_DATA_CENTER", global = true)]
    pub data_center: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TIDEWATCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "TIDEWATCH_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "TIDEWATCH_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and save the session for this profile
    Login(LoginArgs),

    /// Sign out and delete the saved session
    Logout,

    /// Show the signed-in user and roles
    Whoami,

    /// Manage device models
    #[command(alias = "m")]
    Models(ModelsArgs),

    /// Manage devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Manage firmware images
    #[command(alias = "fw")]
    Firmware(FirmwareArgs),

    /// Browse device telemetry
    Data(DataArgs),

    /// Stream live telemetry for a device model
    Watch(WatchArgs),

    /// Manage users
    Users(UsersArgs),

    /// Manage roles
    Roles(RolesArgs),

    /// Manage menus and inspect the route tree
    Menus(MenusArgs),

    /// Manage permissions
    Permissions(PermissionsArgs),

    /// Queue and inspect device commands
    Commands(CommandsArgs),

    /// Manage device properties
    #[command(alias = "props")]
    Properties(PropertiesArgs),

    /// Grant users access to devices
    Access(AccessArgs),

    /// Build an Excel export link for a device and date range
    Export(ExportArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SESSION
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Username (defaults to the profile's username)
    #[arg(long, short = 'u')]
    pub username: Option<String>,

    /// Where to write the captcha image
    #[arg(long, default_value = "tidewatch-captcha.png")]
    pub captcha_file: PathBuf,

    /// Captcha answer (prompted for when omitted)
    #[arg(long)]
    pub code: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  MODELS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ModelsCommand {
    /// List device models
    #[command(alias = "ls")]
    List {
        /// Bypass the cached catalog
        #[arg(long, short = 'r')]
        refresh: bool,
    },

    /// Get device model details
    Get {
        /// Model ID or model number
        model: String,
    },

    /// Create a device model
    Create(ModelFormArgs),

    /// Update a device model
    Update {
        /// Model ID or model number
        model: String,

        #[command(flatten)]
        form: ModelFormArgs,
    },

    /// Delete a device model
    Delete {
        /// Model ID or model number
        model: String,
    },

    /// List serial number options for a model
    Serials {
        /// Model ID or model number
        model: String,
    },
}

#[derive(Debug, Args)]
pub struct ModelFormArgs {
    /// Model number (e.g. "WB-100")
    #[arg(long)]
    pub number: String,

    /// Display name
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Telemetry storage bucket
    #[arg(long)]
    pub bucket: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices
    #[command(alias = "ls")]
    List {
        /// Only devices of this model (ID or model number)
        #[arg(long, short = 'm')]
        model: Option<String>,
    },

    /// Get device details
    Get {
        /// Serial number or device ID
        device: String,
    },

    /// Register a device
    Create {
        /// Owning model (ID or model number)
        #[arg(long, short = 'm')]
        model: String,

        /// Serial number
        serial: String,

        #[arg(long, default_value = "")]
        name: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Update a device's name or description
    Update {
        /// Serial number or device ID
        device: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a device
    Delete {
        /// Serial number or device ID
        device: String,
    },

    /// Devices of a model the signed-in user may see
    Mine {
        /// Model ID or model number
        model: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  FIRMWARE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct FirmwareArgs {
    #[command(subcommand)]
    pub command: FirmwareCommand,
}

#[derive(Debug, Subcommand)]
pub enum FirmwareCommand {
    /// List firmware for a model or a device
    #[command(alias = "ls")]
    List {
        /// Model ID or model number
        #[arg(long, short = 'm', conflicts_with = "device")]
        model: Option<String>,

        /// Serial number or device ID
        #[arg(long, short = 'd')]
        device: Option<String>,
    },

    /// Upload a firmware image
    Upload {
        /// Target model (ID or model number)
        #[arg(long, short = 'm')]
        model: String,

        /// Firmware version string
        #[arg(id = "firmware_version", long = "firmware-version")]
        version: String,

        /// Image file
        file: PathBuf,

        #[arg(long)]
        description: Option<String>,

        /// Supported hardware version (repeatable)
        #[arg(long = "hardware")]
        hardware: Vec<String>,
    },

    /// Delete a firmware image
    Delete {
        /// Firmware ID
        id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DATA
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DataArgs {
    #[command(subcommand)]
    pub command: DataCommand,
}

/// Shared anchor paging arguments.
#[derive(Debug, Args)]
pub struct PagingArgs {
    /// Number of pages to walk, newest first
    #[arg(long, default_value = "1")]
    pub pages: u32,

    /// Rows per page (overrides profile page_size)
    #[arg(long, short = 'l')]
    pub limit: Option<u32>,

    /// Start strictly before this timestamp
    #[arg(long)]
    pub before: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum DataCommand {
    /// Parsed telemetry for one device
    Parsed {
        /// Serial number or device ID
        device: String,

        /// Upload channel filter (1 = 4G, 2 = Beidou, 4 = Iridium)
        #[arg(long, short = 'c')]
        channel: Option<String>,

        /// Render coded fields (channel, hemispheres, battery) as text
        #[arg(long)]
        decode: bool,

        /// Keep the newest page open and print live pushes (Ctrl-C to stop)
        #[arg(long, short = 'f', conflicts_with_all = ["before", "pages"])]
        follow: bool,

        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Range query straight against the device model's bucket
    Query {
        /// Serial number or device ID
        device: String,

        /// Upload channel number
        #[arg(long, short = 'c')]
        channel: Option<u8>,

        /// Range start (RFC 3339, or YYYY-MM-DD for start of day)
        #[arg(long)]
        start: Option<String>,

        /// Range end (RFC 3339, or YYYY-MM-DD for end of day)
        #[arg(long)]
        end: Option<String>,

        /// Only records older than this timestamp
        #[arg(long)]
        before: Option<String>,

        /// Maximum records to return
        #[arg(long)]
        limit: Option<u32>,

        /// Oldest first
        #[arg(long)]
        ascending: bool,

        #[arg(long)]
        decode: bool,
    },

    /// Device status reports
    Status {
        /// Serial number or device ID
        device: String,

        #[arg(long)]
        decode: bool,

        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Raw Beidou short messages
    Beidou {
        #[arg(long)]
        from_card: Option<String>,

        #[arg(long)]
        to_card: Option<String>,

        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Raw Iridium SBD messages
    Iridium {
        #[arg(long)]
        imei: Option<String>,

        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Offset-paged device data listing
    Page {
        /// Serial number or device ID
        device: String,

        /// Upload channel number
        #[arg(long, short = 'c', default_value = "1")]
        channel: u8,

        /// 1-based page number
        #[arg(long, default_value = "1")]
        page: u32,

        /// Rows per page
        #[arg(long, default_value = "20")]
        size: u32,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Model ID or model number
    pub model: String,

    /// Stop after this many records
    #[arg(long, short = 'n')]
    pub count: Option<u64>,

    #[arg(long)]
    pub decode: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  USERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List users
    #[command(alias = "ls")]
    List,

    /// Get user details
    Get { id: String },

    /// Create a user from a JSON file
    Create {
        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },

    /// Update a user from a JSON file
    Update {
        id: String,

        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },

    /// Delete a user
    Delete { id: String },

    /// Show the role IDs assigned to a user
    Roles { id: String },

    /// Replace the roles assigned to a user
    AssignRoles {
        id: String,

        /// Role IDs
        #[arg(required = true)]
        role_ids: Vec<String>,
    },

    /// Change the signed-in user's password
    ChangePassword,

    /// Reset another user's password
    ResetPassword { id: String },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ROLES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RolesArgs {
    #[command(subcommand)]
    pub command: RolesCommand,
}

#[derive(Debug, Subcommand)]
pub enum RolesCommand {
    /// List roles
    #[command(alias = "ls")]
    List,

    /// Create a role from a JSON file
    Create {
        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },

    /// Update a role from a JSON file
    Update {
        id: String,

        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },

    /// Delete a role
    Delete { id: String },

    /// Show the menu IDs granted to a role
    Menus { id: String },

    /// Replace the menus granted to a role
    AssignMenus {
        id: String,
        menu_ids: Vec<String>,
    },

    /// Show the permission IDs granted to a role
    Permissions { id: String },

    /// Replace the permissions granted to a role
    AssignPermissions {
        id: String,
        permission_ids: Vec<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  MENUS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct MenusArgs {
    #[command(subcommand)]
    pub command: MenusCommand,
}

#[derive(Debug, Subcommand)]
pub enum MenusCommand {
    /// Show the full menu tree
    Tree,

    /// Show the signed-in user's menus
    Mine,

    /// Show the route tree built from the signed-in user's menus
    Routes,

    /// Create a menu from a JSON file
    Create {
        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },

    /// Update a menu from a JSON file
    Update {
        id: String,

        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },

    /// Delete a menu
    Delete { id: String },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PERMISSIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PermissionsArgs {
    #[command(subcommand)]
    pub command: PermissionsCommand,
}

#[derive(Debug, Subcommand)]
pub enum PermissionsCommand {
    /// Show the permission tree
    Tree,

    /// Create a permission from a JSON file
    Create {
        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },

    /// Update a permission from a JSON file
    Update {
        id: String,

        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },

    /// Delete a permission
    Delete { id: String },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICE COMMANDS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CommandsArgs {
    #[command(subcommand)]
    pub command: CommandsCommand,
}

#[derive(Debug, Subcommand)]
pub enum CommandsCommand {
    /// List commands queued for a device
    #[command(alias = "ls")]
    List {
        /// Serial number or device ID
        device: String,
    },

    /// Queue a command for a device
    Send {
        /// Serial number or device ID
        device: String,

        command: String,

        #[arg(long)]
        parameter: Option<String>,
    },

    /// Delete a queued command
    Delete { id: String },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PROPERTIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PropertiesArgs {
    #[command(subcommand)]
    pub command: PropertiesCommand,
}

#[derive(Debug, Subcommand)]
pub enum PropertiesCommand {
    /// List a device's properties
    #[command(alias = "ls")]
    List {
        /// Serial number or device ID
        device: String,
    },

    /// Create or update a property
    Set {
        /// Serial number or device ID
        device: String,

        key: String,

        #[arg(long)]
        value: String,

        /// Display name (defaults to the key)
        #[arg(long)]
        name: Option<String>,

        /// Value type (e.g. int, string)
        #[arg(long = "type", default_value = "string")]
        kind: String,

        #[arg(long, default_value = "")]
        unit: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long)]
        read_only: bool,

        #[arg(long, default_value = "0")]
        order: i32,

        /// Create the property instead of updating it
        #[arg(long)]
        create: bool,
    },

    /// Delete a property
    Delete {
        /// Serial number or device ID
        device: String,

        key: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ACCESS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AccessArgs {
    #[command(subcommand)]
    pub command: AccessCommand,
}

#[derive(Debug, Subcommand)]
pub enum AccessCommand {
    /// List devices assigned to a user within a model
    #[command(alias = "ls")]
    List {
        /// User ID
        user: String,

        /// Model ID or model number
        #[arg(long, short = 'm')]
        model: String,
    },

    /// Replace the devices assigned to a user within a model
    Assign {
        /// User ID
        user: String,

        /// Model ID or model number
        #[arg(long, short = 'm')]
        model: String,

        /// Serial numbers or device IDs
        devices: Vec<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  EXPORT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Serial number or device ID
    pub device: String,

    /// Upload channel filter
    #[arg(long, short = 'c')]
    pub channel: Option<String>,

    /// Range start (RFC 3339); prompted for when omitted
    #[arg(long, requires = "end")]
    pub start: Option<String>,

    /// Range end (RFC 3339)
    #[arg(long, requires = "start")]
    pub end: Option<String>,

    /// Send the range in UTC
    #[arg(long)]
    pub utc: bool,

    /// Longest range allowed, in days
    #[arg(long, default_value = "60")]
    pub max_days: u32,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key (e.g. "auth_center", "page_size")
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the active profile's password in the system keyring
    SetPassword,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
