//! Subcommands and their output

use clap::{Args, Subcommand};
use color_eyre::{eyre::eyre, Result};

use stockpile::cache::{EntityCache, StockStatus};
use stockpile::config::Config;
use stockpile::inventory::{Article, ArticlePatch, InventoryCache};
use stockpile::remote::HttpStore;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// List all articles with their stock status
  List {
    /// Ignore the cached list
    #[arg(long)]
    refresh: bool,
  },
  /// Show one article
  Show { id: String },
  /// Articles at or below their minimum stock
  Low,
  /// Articles with nothing left
  Empty,
  /// Create an article (requires --sku and --name)
  Create {
    #[command(flatten)]
    fields: FieldArgs,
  },
  /// Change fields of an article
  Update {
    id: String,
    #[command(flatten)]
    fields: FieldArgs,
  },
  /// Change the minimum stock of an article
  SetMinStock { id: String, value: f64 },
  /// Delete an article
  Delete { id: String },
}

#[derive(Args, Debug, Default)]
pub struct FieldArgs {
  #[arg(long)]
  sku: Option<String>,
  #[arg(long)]
  name: Option<String>,
  #[arg(long)]
  stock: Option<f64>,
  #[arg(long)]
  min_stock: Option<f64>,
  #[arg(long)]
  unit: Option<String>,
  #[arg(long)]
  location: Option<String>,
  #[arg(long)]
  notes: Option<String>,
}

impl From<FieldArgs> for ArticlePatch {
  fn from(f: FieldArgs) -> Self {
    ArticlePatch {
      sku: f.sku,
      name: f.name,
      stock: f.stock,
      min_stock: f.min_stock,
      unit: f.unit,
      location: f.location,
      notes: f.notes,
    }
  }
}

/// Run one command against the configured API.
pub async fn run(config: &Config, command: Command) -> Result<()> {
  let store = HttpStore::<Article>::new(
    config.remote.base_url()?,
    config.remote.resource.clone(),
    config.remote.timeout(),
  )?
  .with_token(Config::get_api_token());
  let cache: InventoryCache<HttpStore<Article>> =
    EntityCache::new(store).with_ttl(config.cache.ttl());

  match command {
    Command::List { refresh } => {
      cache.fetch_all(refresh).await?;
      print_table(&cache.all());
    }
    Command::Show { id } => {
      let article = cache.fetch_one(id).await?;
      print_detail(&article);
    }
    Command::Low => {
      cache.fetch_all(false).await?;
      print_table(&cache.low_stock_items());
    }
    Command::Empty => {
      cache.fetch_all(false).await?;
      print_table(&cache.empty_items());
    }
    Command::Create { fields } => {
      let patch = ArticlePatch::from(fields);
      if patch.sku.is_none() || patch.name.is_none() {
        return Err(eyre!("create needs --sku and --name"));
      }
      let created = cache.create_one(patch).await?;
      print_detail(&created);
    }
    Command::Update { id, fields } => {
      let patch = ArticlePatch::from(fields);
      if patch == ArticlePatch::default() {
        return Err(eyre!("Nothing to update for article {}", id));
      }
      let saved = cache.update_one(id, patch).await?;
      print_detail(&saved);
    }
    Command::SetMinStock { id, value } => {
      let saved = cache.set_min_stock(id, value).await?;
      print_detail(&saved);
    }
    Command::Delete { id } => {
      cache.remove_one(id.as_str()).await?;
      println!("Deleted article {}", id);
    }
  }

  Ok(())
}

fn print_table(articles: &[Article]) {
  if articles.is_empty() {
    println!("No articles.");
    return;
  }
  println!(
    "{:<8} {:<12} {:<28} {:>8} {:>8}  {}",
    "ID", "SKU", "NAME", "STOCK", "MIN", "STATUS"
  );
  for article in articles {
    println!("{}", format_row(article));
  }
}

fn print_detail(article: &Article) {
  println!("ID:       {}", article.id);
  println!("SKU:      {}", article.sku);
  println!("Name:     {}", article.name);
  println!("Stock:    {}", format_quantity(article.stock, article.unit.as_deref()));
  println!(
    "Minimum:  {}",
    article
      .min_stock
      .map(|m| format_quantity(m, article.unit.as_deref()))
      .unwrap_or_else(|| "-".to_string())
  );
  println!("Status:   {}", StockStatus::classify(article));
  if let Some(location) = &article.location {
    println!("Location: {}", location);
  }
  if let Some(notes) = &article.notes {
    println!("Notes:    {}", notes);
  }
}

fn format_row(article: &Article) -> String {
  format!(
    "{:<8} {:<12} {:<28} {:>8} {:>8}  {}",
    article.id.to_string(),
    truncate(&article.sku, 12),
    truncate(&article.name, 28),
    article.stock,
    article
      .min_stock
      .map(|m| m.to_string())
      .unwrap_or_else(|| "-".to_string()),
    StockStatus::classify(article)
  )
}

fn format_quantity(value: f64, unit: Option<&str>) -> String {
  match unit {
    Some(unit) => format!("{} {}", value, unit),
    None => value.to_string(),
  }
}

/// Cut to `max` characters, marking the cut with an ellipsis.
fn truncate(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    return s.to_string();
  }
  let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
  out.push('…');
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use stockpile::inventory::ArticleId;

  fn hammer() -> Article {
    Article {
      id: ArticleId::Number(1),
      sku: "HM-01".to_string(),
      name: "Hammer".to_string(),
      stock: 1.0,
      min_stock: Some(2.0),
      unit: Some("Stk".to_string()),
      location: None,
      notes: None,
    }
  }

  #[test]
  fn test_row_shows_status() {
    let row = format_row(&hammer());
    assert!(row.starts_with("1 "));
    assert!(row.ends_with("low"));
    assert!(row.contains("Hammer"));
  }

  #[test]
  fn test_quantity_formatting() {
    assert_eq!(format_quantity(10.0, None), "10");
    assert_eq!(format_quantity(2.5, Some("m")), "2.5 m");
  }

  #[test]
  fn test_truncate() {
    assert_eq!(truncate("Hammer", 10), "Hammer");
    assert_eq!(truncate("Schlagbohrmaschine", 8), "Schlagb…");
  }

  #[test]
  fn test_field_args_into_patch() {
    let patch = ArticlePatch::from(FieldArgs {
      stock: Some(3.0),
      ..Default::default()
    });
    assert_eq!(patch.stock, Some(3.0));
    assert_eq!(patch.name, None);
  }
}
