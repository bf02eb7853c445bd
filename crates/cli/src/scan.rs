use crate::session::Session;
use crate::{ClasspathArgs, GlobalArgs};
use classdex_core::{PackageTree, ScanReport};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct PackageRow {
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Sub-packages")]
    children: usize,
    #[tabled(rename = "Types")]
    types: usize,
}

pub async fn run(
    global: &GlobalArgs,
    classpath: &ClasspathArgs,
    packages: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::new(global, classpath)?;
    if session.entries.is_empty() {
        println!("Nothing to scan: no JDK found and no classpath given.");
        return Ok(());
    }

    let coordinator = session.coordinator();
    let tree = coordinator.ready().await?;
    if let Some(report) = coordinator.report() {
        print_report(&report, &tree);
    }

    if let Some(prefix) = packages {
        print_packages(&tree, prefix);
    }
    Ok(())
}

fn print_report(report: &ScanReport, tree: &PackageTree) {
    println!(
        "Entries:  {} total, {} indexed, {} skipped, {} failed",
        report.total_entries,
        report.indexed_entries,
        report.skipped_entries,
        report.failed_entries
    );
    println!("Packages: {}", tree.package_count());
    println!("Types:    {}", tree.type_count());
    println!(
        "Platform: {}",
        if report.from_cache { "from cache" } else { "scanned" }
    );
    println!("Time:     {:.2?}", report.duration);
}

fn package_rows(tree: &PackageTree, prefix: &str) -> Option<Vec<PackageRow>> {
    let node = tree.lookup_dotted(prefix)?;
    Some(
        node.children()
            .map(|child| PackageRow {
                package: if prefix.is_empty() {
                    child.name().to_string()
                } else {
                    format!("{}.{}", prefix, child.name())
                },
                children: child.children().count(),
                types: child.types().count(),
            })
            .collect(),
    )
}

fn print_packages(tree: &PackageTree, prefix: &str) {
    match package_rows(tree, prefix) {
        Some(rows) if !rows.is_empty() => println!("\n{}", Table::new(rows)),
        Some(_) => println!("\nPackage '{}' has no sub-packages.", prefix),
        None => println!("\nPackage '{}' not found.", prefix),
    }
}
