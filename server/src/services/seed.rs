// server/src/services/seed.rs

//! Reference data created at startup when `SEED_DB` is set. Running it again
//! creates nothing new.

use crate::config::AppConfig;
use crate::errors::Result;
use crate::models::{NewAccount, NewBrand, NewCategory, Role, Roles};
use crate::services::auth_service;
use crate::store::Store;
use tracing::{info, instrument};

pub const DEFAULT_CATEGORY_SLUG: &str = "general";
pub const DEFAULT_BRAND_NAME: &str = "Generic";

#[instrument(name = "seed::seed_reference_data", skip_all)]
pub async fn seed_reference_data(store: &dyn Store, config: &AppConfig) -> Result<()> {
  if let (Some(email), Some(password)) = (&config.seed_admin_email, &config.seed_admin_password) {
    if store.account_by_email(email).await?.is_none() {
      let account = store
        .insert_account(NewAccount {
          email: email.clone(),
          password_hash: auth_service::hash_password(password)?,
          first_name: "Admin".to_string(),
          last_name: String::new(),
          phone_number: None,
          shipping_address: None,
          roles: Roles::of(&[Role::Customer, Role::Seller, Role::Staff]),
        })
        .await?;
      info!(account_id = account.id, "Seeded staff account.");
    }
  }

  let categories = store.list_categories().await?;
  if !categories.iter().any(|c| c.slug == DEFAULT_CATEGORY_SLUG) {
    store
      .insert_category(NewCategory {
        name: "General".to_string(),
        slug: DEFAULT_CATEGORY_SLUG.to_string(),
        description: "Products without a more specific category.".to_string(),
        parent_id: None,
      })
      .await?;
    info!("Seeded default category.");
  }

  let brands = store.list_brands().await?;
  if !brands.iter().any(|b| b.name == DEFAULT_BRAND_NAME) {
    store
      .insert_brand(NewBrand {
        name: DEFAULT_BRAND_NAME.to_string(),
        description: String::new(),
        logo: None,
      })
      .await?;
    info!("Seeded default brand.");
  }
  Ok(())
}
