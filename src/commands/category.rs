use crate::api::Mode;
use crate::commands::{coordinator, Out};
use crate::model::{Category, RecordId};
use crate::{Config, Result};

pub async fn list_categories(config: Config, mode: Mode) -> Result<Out<Vec<Category>>> {
    let sync = coordinator(&config, mode)?;
    sync.reload_categories().await?;
    let categories = sync.view().await.categories;
    let names: Vec<String> = categories
        .iter()
        .map(|c| format!("  [{}] {}", c.id, c.name))
        .collect();
    Ok(Out::new(
        format!("{} categories\n{}", categories.len(), names.join("\n")),
        categories,
    ))
}

pub async fn add_category(config: Config, mode: Mode, name: &str) -> Result<Out<Category>> {
    let sync = coordinator(&config, mode)?;
    let category = sync.create_category(name).await?;
    Ok(Out::new(
        format!("Category '{}' added with ID {}", category.name, category.id),
        category,
    ))
}

pub async fn delete_category(config: Config, mode: Mode, id: &RecordId) -> Result<Out<()>> {
    let sync = coordinator(&config, mode)?;
    sync.delete_category(id).await?;
    Ok(format!("Category {id} deleted").into())
}
