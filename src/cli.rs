use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(name = "stackops", version, about = "Operator tools for a Docker Compose stack")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(long, global = true, help = "Config file (default ~/.config/stackops/config.toml)")]
    pub config: Option<String>,
    #[arg(short, long, global = true, action = ArgAction::Count, help = "More log output on stderr (-v, -vv)")]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Ports {
        #[command(subcommand)]
        command: PortsCommands,
    },
    Perms {
        #[command(subcommand)]
        command: PermsCommands,
    },
    Remote {
        #[command(subcommand)]
        command: RemoteCommands,
    },
    Diag {
        #[command(subcommand)]
        command: DiagCommands,
    },
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
    Stack {
        #[command(subcommand)]
        command: StackCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum PortsCommands {
    /// Rewrite one port mapping inside a service block
    Remap {
        #[arg(long, default_value = "docker-compose.yml")]
        compose: String,
        #[arg(long)]
        service: String,
        #[arg(long, help = "Existing mapping, e.g. 8080:80")]
        from: String,
        #[arg(long, help = "Replacement mapping, e.g. 8082:80")]
        to: String,
        #[arg(long, default_value_t = false)]
        no_restart: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum PermsCommands {
    /// Add the executable bits to matching files
    Fix {
        #[arg(long, default_value = ".")]
        path: String,
        #[arg(long, default_value = "*.sh")]
        pattern: String,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum RemoteCommands {
    /// Run one command over ssh from a JSON request (stdin when --request is omitted)
    Exec {
        #[arg(long)]
        request: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum DiagCommands {
    /// Capture stack state into a timestamped archive
    Collect {
        #[arg(long)]
        out_root: Option<String>,
    },
    /// Unpack an archive and summarize it
    Extract {
        #[arg(long)]
        archive: Option<String>,
        #[arg(long)]
        out_root: Option<String>,
        #[arg(long, default_value_t = 50)]
        lines: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum ExportCommands {
    /// Copy, redact and snapshot a repository
    Run {
        repo_name: String,
        #[arg(long, default_value_t = false)]
        private: bool,
        #[arg(long, default_value_t = false)]
        publish: bool,
        #[arg(long, default_value = ".")]
        src: String,
        #[arg(long)]
        dest: String,
        #[arg(long = "exclude")]
        exclude: Vec<String>,
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Redact secret values in one key=value file
    Redact {
        file: String,
        #[arg(long, default_value_t = false)]
        in_place: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum StackCommands {
    /// Write stub files and bring the stack up
    Bootstrap {
        #[arg(long)]
        dir: Option<String>,
        #[arg(long, value_enum, default_value_t = BootstrapVariant::Minimal)]
        variant: BootstrapVariant,
        #[arg(long, default_value_t = false)]
        force: bool,
        #[arg(long, default_value_t = false)]
        no_up: bool,
        #[arg(long, default_value_t = false)]
        follow: bool,
    },
    /// Restart one compose service
    Restart { service: String },
    /// Probe the configured health endpoints
    Health,
}

#[derive(Clone, Debug, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BootstrapVariant {
    Minimal,
    Proxy,
    Full,
}
