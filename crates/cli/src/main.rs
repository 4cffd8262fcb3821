//! Command-line front end for the docstore core.
//!
//! ## Purpose
//! Operates the document store from a shell: uploading files, reading
//! metadata, downloading content and running deletions. Useful for
//! development and for operational one-offs where the HTTP front end is not
//! in the picture.
//!
//! ## Environment
//! - `DOCSTORE_DATA_DIR`: metadata row store root (default: `docstore_data`)
//! - `DOCSTORE_BLOB_DIR`: blob store root (default: `docstore_blobs`)
//! - `DOCSTORE_CASE_WORKER_ROLES`: comma-separated case-worker allowlist
//!
//! Environment is resolved once here at startup; the core never reads it.

use clap::{Parser, Subcommand};
use docstore_blob::FsBlobStore;
use docstore_core::{
    case_worker_roles_from_env_value, Caller, CanonicalUuid, CaseDeletionService, CaseRef,
    Classification, ContentVersionService, CoreConfig, FsMetadataStore, NonEmptyText,
    PermissionService, StoredDocumentService, UploadDocumentsCommand, UploadedContent,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "docstore")]
#[command(about = "Document store with role- and creator-based access control")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload one or more files as new documents
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Classification (PUBLIC, PRIVATE or RESTRICTED)
        #[arg(long, default_value = "PRIVATE")]
        classification: String,
        /// Roles authorised to act on the documents (comma-separated)
        #[arg(long, value_delimiter = ',')]
        roles: Vec<String>,
        /// Case reference to link the documents to
        #[arg(long)]
        case_ref: Option<String>,
        /// Acting subject id
        #[arg(long)]
        user: String,
        /// Acting subject's roles (comma-separated)
        #[arg(long, value_delimiter = ',')]
        user_roles: Vec<String>,
    },
    /// Print a document's metadata as JSON
    Read {
        /// Document id (32 lowercase hex characters)
        document_id: String,
        /// Acting subject id
        #[arg(long)]
        user: String,
        /// Acting subject's roles (comma-separated)
        #[arg(long, value_delimiter = ',')]
        user_roles: Vec<String>,
    },
    /// Download the most recent content of a document
    Download {
        /// Document id (32 lowercase hex characters)
        document_id: String,
        /// Output file path
        output: PathBuf,
        /// Acting subject id
        #[arg(long)]
        user: String,
        /// Acting subject's roles (comma-separated)
        #[arg(long, value_delimiter = ',')]
        user_roles: Vec<String>,
    },
    /// Soft-delete a document (add --hard to delete its binaries too)
    Delete {
        /// Document id (32 lowercase hex characters)
        document_id: String,
        /// Also delete the binary content of every version
        #[arg(long)]
        hard: bool,
        /// Acting subject id
        #[arg(long)]
        user: String,
        /// Acting subject's roles (comma-separated)
        #[arg(long, value_delimiter = ',')]
        user_roles: Vec<String>,
    },
    /// Soft-delete all documents linked to a case and clear their binaries
    DeleteCase {
        /// Case reference
        case_ref: String,
    },
}

struct Services {
    documents: StoredDocumentService,
    case_deletion: CaseDeletionService,
}

fn build_services() -> anyhow::Result<Services> {
    let data_dir =
        PathBuf::from(std::env::var("DOCSTORE_DATA_DIR").unwrap_or_else(|_| "docstore_data".into()));
    let blob_dir =
        PathBuf::from(std::env::var("DOCSTORE_BLOB_DIR").unwrap_or_else(|_| "docstore_blobs".into()));
    let case_worker_roles =
        case_worker_roles_from_env_value(std::env::var("DOCSTORE_CASE_WORKER_ROLES").ok());

    fs::create_dir_all(&data_dir)?;
    fs::create_dir_all(&blob_dir)?;

    let cfg = CoreConfig::new(data_dir, blob_dir, case_worker_roles)?;

    tracing::info!(
        data_dir = %cfg.data_dir().display(),
        blob_dir = %cfg.blob_dir().display(),
        case_worker_roles = cfg.case_worker_roles().len(),
        "docstore storage initialised"
    );

    let store = Arc::new(FsMetadataStore::new(cfg.data_dir())?);
    let blob = Arc::new(FsBlobStore::new(cfg.blob_dir())?);
    let content = ContentVersionService::new(blob, store.clone());
    let permissions = PermissionService::new(cfg.case_worker_roles().clone());

    Ok(Services {
        documents: StoredDocumentService::new(store.clone(), content.clone(), permissions),
        case_deletion: CaseDeletionService::new(store, content),
    })
}

fn caller_from(user: &str, user_roles: Vec<String>) -> anyhow::Result<Caller> {
    Ok(Caller::new(user, user_roles)?)
}

fn read_upload(path: &PathBuf) -> anyhow::Result<UploadedContent> {
    let bytes = fs::read(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
    let original_filename = NonEmptyText::new(
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed"),
    )?;
    Ok(UploadedContent {
        bytes,
        // Left to the core to sniff; the shell knows no better.
        mime_type: None,
        original_filename,
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let services = build_services()?;

    match cli.command {
        Commands::Upload {
            files,
            classification,
            roles,
            case_ref,
            user,
            user_roles,
        } => {
            let caller = caller_from(&user, user_roles)?;
            let command = UploadDocumentsCommand {
                files: files.iter().map(read_upload).collect::<Result<_, _>>()?,
                classification: classification.parse::<Classification>()?,
                roles: roles.into_iter().collect(),
                case_ref: case_ref.map(CaseRef::new).transpose()?,
            };
            let documents = services.documents.create_from(&command, &caller)?;
            for document in documents {
                println!(
                    "{}  {}  {}",
                    document.id,
                    document.classification,
                    document.versions[0].original_filename
                );
            }
        }
        Commands::Read {
            document_id,
            user,
            user_roles,
        } => {
            let id = document_id.parse::<CanonicalUuid>()?;
            let caller = caller_from(&user, user_roles)?;
            let document = services.documents.read(&id, &caller)?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Commands::Download {
            document_id,
            output,
            user,
            user_roles,
        } => {
            let id = document_id.parse::<CanonicalUuid>()?;
            let caller = caller_from(&user, user_roles)?;
            let (version, bytes) = services.documents.read_binary(&id, &caller)?;
            fs::write(&output, &bytes)?;
            println!(
                "wrote {} bytes of {} to {}",
                bytes.len(),
                version.original_filename,
                output.display()
            );
        }
        Commands::Delete {
            document_id,
            hard,
            user,
            user_roles,
        } => {
            let id = document_id.parse::<CanonicalUuid>()?;
            let caller = caller_from(&user, user_roles)?;
            services.documents.delete(&id, &caller, hard)?;
            println!(
                "document {id} {}",
                if hard { "hard-deleted" } else { "soft-deleted" }
            );
        }
        Commands::DeleteCase { case_ref } => {
            let case_ref = CaseRef::new(case_ref)?;
            let report = services.case_deletion.delete_all_for_case(&case_ref)?;
            println!(
                "deleted {} document(s) for case {case_ref}",
                report.deleted
            );
            if !report.failed_ids.is_empty() {
                println!("failed (retry with the same command):");
                for id in report.failed_ids {
                    println!("  {id}");
                }
            }
        }
    }

    Ok(())
}
