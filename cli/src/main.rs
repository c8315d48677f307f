//! avrokit-cli (`avk`) is a command line tool for working with avro schemas:
//! validating and normalizing schema documents, generating Rust types from
//! them, inspecting wire-format payloads and testing JSON datums against a
//! schema.

mod codegen;
mod subcommand;
mod utils;

use std::path::PathBuf;
use structopt::StructOpt;
use subcommand::{create_schema, generate_code, get_schema, test_schema};

#[derive(StructOpt, Debug)]
#[structopt(about = "Command line tool for creating, inspecting and testing avro schemas")]
enum AvrokitCli {
    #[structopt(
        name = "create-schema",
        about = "Validate a schema document and print it normalized"
    )]
    CreateSchema {
        #[structopt(short)]
        schema: PathBuf,
        /// Print the Parsing Canonical Form instead of the full form
        #[structopt(long)]
        canonical: bool,
    },
    #[structopt(
        name = "generate-code",
        about = "Generate Rust type definitions from a schema"
    )]
    GenerateCode {
        #[structopt(short)]
        schema: PathBuf,
    },
    #[structopt(
        name = "get-schema",
        about = "Print the schema id embedded in a wire-format payload"
    )]
    GetSchema {
        #[structopt(short)]
        datafile: PathBuf,
        /// Directory holding `<id>.avsc` files; when given, the schema JSON
        /// is printed as well
        #[structopt(long)]
        registry_dir: Option<PathBuf>,
    },
    #[structopt(
        name = "test-schema",
        about = "Check that a JSON datum conforms to a schema"
    )]
    TestSchema {
        #[structopt(short)]
        schema: PathBuf,
        #[structopt(short)]
        datum: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    use AvrokitCli::*;
    let opt = AvrokitCli::from_args();
    match opt {
        CreateSchema { schema, canonical } => create_schema(&schema, canonical)?,
        GenerateCode { schema } => generate_code(&schema)?,
        GetSchema {
            datafile,
            registry_dir,
        } => get_schema(&datafile, registry_dir.as_deref())?,
        TestSchema { schema, datum } => test_schema(&schema, &datum)?,
    }

    Ok(())
}
