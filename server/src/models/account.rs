// server/src/models/account.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Customer,
  Seller,
  Staff,
}

impl Role {
  pub const ALL: [Role; 3] = [Role::Customer, Role::Seller, Role::Staff];

  const fn bit(self) -> i16 {
    match self {
      Role::Customer => 0b001,
      Role::Seller => 0b010,
      Role::Staff => 0b100,
    }
  }
}

/// The capabilities held by one account.
///
/// Any combination is allowed; an account that sells usually buys too.
/// Persisted as a small bitmask, exposed over JSON as a list of role names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Roles(i16);

impl Roles {
  const MASK: i16 = 0b111;

  pub fn empty() -> Self {
    Roles(0)
  }

  pub fn of(roles: &[Role]) -> Self {
    roles.iter().fold(Roles::empty(), |acc, r| acc.with(*r))
  }

  pub fn with(self, role: Role) -> Self {
    Roles(self.0 | role.bit())
  }

  pub fn contains(self, role: Role) -> bool {
    self.0 & role.bit() != 0
  }

  pub fn bits(self) -> i16 {
    self.0
  }

  pub fn iter(self) -> impl Iterator<Item = Role> {
    Role::ALL.into_iter().filter(move |r| self.contains(*r))
  }
}

impl TryFrom<i16> for Roles {
  type Error = String;

  fn try_from(bits: i16) -> Result<Self, Self::Error> {
    if bits & !Roles::MASK != 0 {
      return Err(format!("unknown role bits in {bits:#b}"));
    }
    Ok(Roles(bits))
  }
}

impl Serialize for Roles {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(self.iter())
  }
}

impl<'de> Deserialize<'de> for Roles {
  fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let roles = Vec::<Role>::deserialize(deserializer)?;
    Ok(Roles::of(&roles))
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
  pub id: i64,
  pub email: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub first_name: String,
  pub last_name: String,
  pub phone_number: Option<String>,
  pub profile_picture: Option<String>,
  pub shipping_address: Option<String>,
  #[sqlx(try_from = "i16")]
  pub roles: Roles,
  pub is_active: bool,
  pub date_joined: DateTime<Utc>,
}

impl Account {
  pub fn is_staff(&self) -> bool {
    self.roles.contains(Role::Staff)
  }

  pub fn is_seller(&self) -> bool {
    self.roles.contains(Role::Seller)
  }
}

/// Chosen at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
  Customer,
  Vendor,
}

impl AccountType {
  /// New accounts are always customers; vendors can also sell.
  pub fn initial_roles(self) -> Roles {
    match self {
      AccountType::Customer => Roles::of(&[Role::Customer]),
      AccountType::Vendor => Roles::of(&[Role::Customer, Role::Seller]),
    }
  }
}

/// Sign-up form.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
  pub email: String,
  pub password: String,
  pub confirm_password: String,
  pub first_name: String,
  #[serde(default)]
  pub last_name: String,
  pub phone_number: Option<String>,
  pub shipping_address: Option<String>,
  #[serde(default = "default_account_type")]
  pub account_type: AccountType,
}

fn default_account_type() -> AccountType {
  AccountType::Customer
}

#[derive(Debug, Clone)]
pub struct NewAccount {
  pub email: String,
  pub password_hash: String,
  pub first_name: String,
  pub last_name: String,
  pub phone_number: Option<String>,
  pub shipping_address: Option<String>,
  pub roles: Roles,
}

/// Partial profile update. Absent fields are left untouched; the email is
/// not part of it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdate {
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub phone_number: Option<String>,
  pub profile_picture: Option<String>,
  pub shipping_address: Option<String>,
}

impl ProfileUpdate {
  pub fn apply(&self, account: &mut Account) {
    if let Some(v) = &self.first_name {
      account.first_name = v.clone();
    }
    if let Some(v) = &self.last_name {
      account.last_name = v.clone();
    }
    if let Some(v) = &self.phone_number {
      account.phone_number = Some(v.clone());
    }
    if let Some(v) = &self.profile_picture {
      account.profile_picture = Some(v.clone());
    }
    if let Some(v) = &self.shipping_address {
      account.shipping_address = Some(v.clone());
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn vendor_accounts_can_buy_and_sell() {
    let roles = AccountType::Vendor.initial_roles();
    assert!(roles.contains(Role::Customer));
    assert!(roles.contains(Role::Seller));
    assert!(!roles.contains(Role::Staff));
  }

  #[test]
  fn roles_serialize_as_names() {
    let roles = Roles::of(&[Role::Staff, Role::Customer]);
    assert_eq!(serde_json::to_value(roles).unwrap(), serde_json::json!(["customer", "staff"]));
    let back: Roles = serde_json::from_value(serde_json::json!(["seller"])).unwrap();
    assert_eq!(back, Roles::of(&[Role::Seller]));
  }

  #[test]
  fn stray_bits_are_rejected() {
    assert!(Roles::try_from(0b1000).is_err());
    assert_eq!(Roles::try_from(0b101).unwrap(), Roles::of(&[Role::Customer, Role::Staff]));
  }
}
