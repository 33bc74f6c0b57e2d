//! Run command: execute the package pipeline over a directory.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use krmpack_core::config::{ACTION_PULL, KRM_PACKAGE_KIND};
use krmpack_core::{KrmPackage, Resource};
use krmpack_filters::{
    report, Diagnostic, GvknFileNameFilter, PackageFilter, SetPathFilter, Severity,
    SingleFileFilter,
};
use krmpack_oci::{HttpTransport, PackageReference, RegistryAuth, RegistryCopier};

use crate::package_io;

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Package directory to read resources from and write results to
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Registry request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,
}

/// Execute the run command.
pub async fn execute(args: RunArgs) -> Result<()> {
    let items = package_io::read_package(&args.dir)?;

    let Some(config_resource) = items.iter().find(|item| item.kind() == KRM_PACKAGE_KIND) else {
        bail!("KRMPackage config resource missing from {}", args.dir.display());
    };

    let mut config =
        KrmPackage::from_resource(config_resource).context("failed to load KRMPackage config")?;
    config.apply_defaults();

    // validated before any network activity; a config failure is the
    // invocation's single diagnostic
    if let Err(err) = config.validate() {
        print_diagnostics(&[Diagnostic::error(err.to_string())]);
        return Err(err.into());
    }

    let transport = HttpTransport::new(
        registry_auth_from_env(),
        Duration::from_secs(args.timeout),
    )?;
    let copier = RegistryCopier::new(Box::new(transport)).with_progress(Box::new(
        |digest: &str, path: &str| {
            tracing::info!(digest, path, "copying blob");
        },
    ));

    let filter = PackageFilter::new(config.clone(), copier);

    let (mut items, outcomes) = match filter.filter(items).await {
        Ok(result) => result,
        Err(err) => {
            print_diagnostics(&[Diagnostic::error(err.to_string())]);
            return Err(err.into());
        }
    };

    if config.action() == ACTION_PULL {
        rename_managed_resources(&config, &mut items);
    }

    package_io::write_package(&args.dir, &items)?;

    let diagnostics = report(&outcomes);
    print_diagnostics(&diagnostics);

    if diagnostics
        .iter()
        .any(|diagnostic| diagnostic.severity == Severity::Error)
    {
        bail!("one or more resources failed to package");
    }

    Ok(())
}

/// Applies the configured renaming chain to the managed (non-local-config)
/// resources after a pull. The user's own local-config files keep their
/// names.
fn rename_managed_resources(config: &KrmPackage, items: &mut [Resource]) {
    let positions: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| !item.is_local_config())
        .map(|(position, _)| position)
        .collect();
    let mut managed: Vec<Resource> = positions.iter().map(|&p| items[p].clone()).collect();

    if !config.spec.path.is_empty() {
        SetPathFilter {
            path: config.spec.path.clone(),
        }
        .filter(&mut managed);
    }

    if config.single_file_output() {
        SingleFileFilter {
            file_name: single_file_name(config),
        }
        .filter(&mut managed);
    } else if config.gvkn_file_names() {
        GvknFileNameFilter.filter(&mut managed);
    }

    for (slot, &position) in positions.iter().enumerate() {
        items[position] = managed[slot].clone();
    }
}

/// Derives the shared output file name from the package repository.
fn single_file_name(config: &KrmPackage) -> String {
    PackageReference::parse(&config.spec.package)
        .ok()
        .and_then(|reference| {
            reference
                .repository
                .rsplit('/')
                .next()
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| "resources".to_string())
}

fn registry_auth_from_env() -> RegistryAuth {
    if let Ok(token) = std::env::var("KRMPACK_REGISTRY_TOKEN") {
        if !token.is_empty() {
            return RegistryAuth::bearer(token);
        }
    }

    match (
        std::env::var("KRMPACK_REGISTRY_USER"),
        std::env::var("KRMPACK_REGISTRY_PASSWORD"),
    ) {
        (Ok(username), Ok(password)) if !username.is_empty() => {
            RegistryAuth::basic(username, password)
        }
        _ => RegistryAuth::Anonymous,
    }
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        match diagnostic.severity {
            Severity::Info => println!("[info] {}", diagnostic.message),
            Severity::Error => eprintln!("[error] {}", diagnostic.message),
        }
    }
}
