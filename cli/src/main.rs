use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use dynaproto::{instance_from_json, instance_to_json, Instance};
use dynaproto_compiler::{compile_schema, error::ProtoError};

#[derive(Parser)]
#[command(name = "dynaproto-cli")]
#[command(about = "Compile schemas and encode or decode messages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a schema file and list the message types it defines
    Check {
        /// Input schema file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Encode a JSON message to its binary form
    Encode {
        /// Input schema file
        #[arg(short, long)]
        schema: PathBuf,

        /// Fully qualified message type, e.g. `demo.Person`
        #[arg(short, long)]
        r#type: String,

        /// Input JSON file
        #[arg(short, long)]
        input: PathBuf,

        /// Output binary file (defaults to same name + `.bin`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode a binary message to JSON (printed to stdout)
    Decode {
        /// Input schema file
        #[arg(short, long)]
        schema: PathBuf,

        /// Fully qualified message type, e.g. `demo.Person`
        #[arg(short, long)]
        r#type: String,

        /// Input binary file
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> Result<(), ProtoError> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Check { input } => {
            let text = fs::read_to_string(input).map_err(ProtoError::Io)?;
            let schema = compile_schema(&text)?;
            for (id, def) in schema.messages() {
                println!("{} ({} fields)", schema.full_name(id), def.fields.len());
            }
            Ok(())
        }

        Commands::Encode {
            schema,
            r#type,
            input,
            output,
        } => {
            let text = fs::read_to_string(schema).map_err(ProtoError::Io)?;
            let schema = compile_schema(&text)?;
            let json_text = fs::read_to_string(input).map_err(ProtoError::Io)?;
            let json: serde_json::Value =
                serde_json::from_str(&json_text).map_err(|err| ProtoError::Syntax {
                    msg:    err.to_string(),
                    line:   err.line(),
                    column: err.column(),
                })?;
            let instance = instance_from_json(&schema, r#type, &json)?;
            let bytes = instance.encode(&schema)?;
            let out_path = if let Some(o) = output {
                o.clone()
            } else {
                let mut p = input.clone();
                p.set_extension("bin");
                p
            };
            fs::write(&out_path, &bytes).map_err(ProtoError::Io)?;
            println!("Encoded {} into {}", input.display(), out_path.display());
            Ok(())
        }

        Commands::Decode {
            schema,
            r#type,
            input,
        } => {
            let text = fs::read_to_string(schema).map_err(ProtoError::Io)?;
            let schema = compile_schema(&text)?;
            let data = fs::read(input).map_err(ProtoError::Io)?;
            let instance = Instance::decode(&schema, r#type, &data)?;
            let json = instance_to_json(&schema, &instance);
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
            Ok(())
        }
    }
}
