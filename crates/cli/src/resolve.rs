use crate::session::Session;
use crate::{ClasspathArgs, GlobalArgs};
use classdex_api::{ImportDirective, TypeShape};
use classdex_core::ImportedType;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct TypeRow {
    #[tabled(rename = "Type")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Module")]
    module: String,
    #[tabled(rename = "Supertypes")]
    supertypes: String,
}

impl TypeRow {
    fn new(imported: &ImportedType) -> Self {
        let shape = imported.shape.as_ref();
        Self {
            name: imported.fqn().to_string(),
            kind: kind(shape),
            module: shape.module_name().unwrap_or_else(|| "-".to_string()),
            supertypes: shape
                .super_types()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

fn kind(shape: &dyn TypeShape) -> &'static str {
    if shape.is_interface() {
        "interface"
    } else if shape.is_final() {
        "final class"
    } else {
        "class"
    }
}

pub async fn run(
    global: &GlobalArgs,
    classpath: &ClasspathArgs,
    import: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let directive = ImportDirective::parse(import)?;
    let session = Session::new(global, classpath)?;
    let resolver = session.resolver();
    resolver.start_scanning();

    let chain = directive.type_chain();
    let types = resolver.resolve_import_async("", &chain).await;
    if types.is_empty() {
        println!("No types found for '{}'.", directive);
        return Ok(());
    }

    let rows: Vec<TypeRow> = types.iter().map(TypeRow::new).collect();
    println!("{}", Table::new(rows));
    Ok(())
}
