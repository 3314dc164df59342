//! Cart entries and their expansion into request items.
//!
//! A submission carries one or more cart entries in one of two shapes. Bulk
//! entries name several item types that share one recipient and location;
//! per-item entries list individually addressed lines of a single type. Both
//! are validated and flattened into [`ItemDraft`]s before anything touches
//! storage.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  employee::{EmployeeId, Recipient},
  status::RequestMode,
};

/// The literal clients send to mean "no recipient yet".
const UNASSIGNED: &str = "unassigned";

// ─── Wire shapes ─────────────────────────────────────────────────────────────

/// A recipient as supplied by a client: a bare employee number, a numeric
/// string, or the literal `"unassigned"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipientField {
  Id(EmployeeId),
  Text(String),
}

/// One named type in a bulk entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkLine {
  pub name: String,
  #[serde(default)]
  pub qty:  Option<i64>,
}

/// One individually addressed line in a per-item entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerItemLine {
  #[serde(default)]
  pub recipient: Option<RecipientField>,
  pub location:  String,
  #[serde(default)]
  pub qty:       Option<i64>,
}

/// One entry of a submitted cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CartEntry {
  Bulk {
    category:  String,
    items:     Vec<BulkLine>,
    #[serde(default)]
    recipient: Option<RecipientField>,
    location:  String,
    purpose:   String,
  },
  PerItem {
    category:        String,
    type_of_request: String,
    purpose:         String,
    items:           Vec<PerItemLine>,
  },
}

// ─── Drafts ──────────────────────────────────────────────────────────────────

/// A validated, not-yet-persisted request item.
///
/// The recipient is still the *requested* one: whether the employee exists
/// is only known inside the storage transaction, see
/// [`ItemDraft::resolve_recipient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
  pub category:            String,
  pub type_of_request:     String,
  pub mode:                RequestMode,
  pub requested_recipient: Option<EmployeeId>,
  pub location:            String,
  pub quantity:            u32,
  pub purpose:             String,
}

impl ItemDraft {
  /// Unknown employee numbers fall back to unassigned instead of failing the
  /// submission.
  pub fn resolve_recipient(
    &self,
    is_known: impl FnOnce(EmployeeId) -> bool,
  ) -> Recipient {
    match self.requested_recipient {
      Some(id) if is_known(id) => Recipient::Employee(id),
      _ => Recipient::Unassigned,
    }
  }
}

/// Validate `entries` and flatten them into one draft per item row.
pub fn expand(entries: &[CartEntry]) -> Result<Vec<ItemDraft>> {
  if entries.is_empty() {
    return Err(Error::validation("cart must contain at least one entry"));
  }

  let mut drafts = Vec::new();
  for (index, entry) in entries.iter().enumerate() {
    let at = index + 1;
    match entry {
      CartEntry::Bulk { category, items, recipient, location, purpose } => {
        let category = required(category, "category", at)?;
        let location = required(location, "location", at)?;
        let recipient = parse_recipient(recipient.as_ref())?;
        if items.is_empty() {
          return Err(Error::validation(format!(
            "cart entry {at} lists no items"
          )));
        }
        for line in items {
          drafts.push(ItemDraft {
            category:            category.clone(),
            type_of_request:     required(&line.name, "item name", at)?,
            mode:                RequestMode::Bulk,
            requested_recipient: recipient,
            location:            location.clone(),
            quantity:            quantity(line.qty, at)?,
            purpose:             purpose.trim().to_owned(),
          });
        }
      }
      CartEntry::PerItem { category, type_of_request, purpose, items } => {
        let category = required(category, "category", at)?;
        let type_of_request = required(type_of_request, "type of request", at)?;
        if items.is_empty() {
          return Err(Error::validation(format!(
            "cart entry {at} lists no items"
          )));
        }
        for line in items {
          drafts.push(ItemDraft {
            category:            category.clone(),
            type_of_request:     type_of_request.clone(),
            mode:                RequestMode::PerItem,
            requested_recipient: parse_recipient(line.recipient.as_ref())?,
            location:            required(&line.location, "location", at)?,
            quantity:            quantity(line.qty, at)?,
            purpose:             purpose.trim().to_owned(),
          });
        }
      }
    }
  }
  Ok(drafts)
}

fn required(value: &str, field: &str, at: usize) -> Result<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(Error::validation(format!(
      "cart entry {at}: {field} is required"
    )));
  }
  Ok(trimmed.to_owned())
}

fn quantity(qty: Option<i64>, at: usize) -> Result<u32> {
  match qty {
    None => Ok(1),
    Some(n) if n >= 1 => u32::try_from(n).map_err(|_| {
      Error::validation(format!("cart entry {at}: quantity {n} is too large"))
    }),
    Some(n) => Err(Error::validation(format!(
      "cart entry {at}: quantity must be at least 1, got {n}"
    ))),
  }
}

/// Turn a client-supplied recipient into an employee number, or `None` for
/// unassigned.
pub fn parse_recipient(field: Option<&RecipientField>) -> Result<Option<EmployeeId>> {
  match field {
    None => Ok(None),
    Some(RecipientField::Id(id)) => Ok(Some(*id)),
    Some(RecipientField::Text(text)) => {
      let text = text.trim();
      if text.is_empty() || text.eq_ignore_ascii_case(UNASSIGNED) {
        return Ok(None);
      }
      text.parse::<EmployeeId>().map(Some).map_err(|_| {
        Error::validation(format!(
          "recipient must be an employee number or \"unassigned\", got {text:?}"
        ))
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn bulk(items: Vec<BulkLine>) -> CartEntry {
    CartEntry::Bulk {
      category: "Peripherals".into(),
      items,
      recipient: Some(RecipientField::Text("1001".into())),
      location: "Line 3".into(),
      purpose: "replacement".into(),
    }
  }

  fn line(name: &str, qty: Option<i64>) -> BulkLine {
    BulkLine { name: name.into(), qty }
  }

  #[test]
  fn bulk_entry_expands_one_item_per_type() {
    let drafts = expand(&[bulk(vec![
      line("Mouse", Some(2)),
      line("Keyboard", Some(1)),
    ])])
    .unwrap();

    assert_eq!(drafts.len(), 2);
    assert_eq!(drafts[0].type_of_request, "Mouse");
    assert_eq!(drafts[0].quantity, 2);
    assert_eq!(drafts[1].type_of_request, "Keyboard");
    assert_eq!(drafts[1].quantity, 1);
    for d in &drafts {
      assert_eq!(d.mode, RequestMode::Bulk);
      assert_eq!(d.requested_recipient, Some(1001));
      assert_eq!(d.location, "Line 3");
      assert_eq!(d.purpose, "replacement");
    }
  }

  #[test]
  fn missing_quantity_defaults_to_one() {
    let drafts = expand(&[bulk(vec![line("Headset", None)])]).unwrap();
    assert_eq!(drafts[0].quantity, 1);
  }

  #[test]
  fn non_positive_quantity_is_rejected() {
    for qty in [0, -3] {
      let err = expand(&[bulk(vec![line("Mouse", Some(qty))])]).unwrap_err();
      assert!(matches!(err, Error::Validation(_)), "{err}");
    }
  }

  #[test]
  fn empty_cart_is_rejected() {
    assert!(matches!(expand(&[]), Err(Error::Validation(_))));
  }

  #[test]
  fn per_item_entry_keeps_each_recipient() {
    let entry = CartEntry::PerItem {
      category:        "Hardware".into(),
      type_of_request: "Laptop".into(),
      purpose:         "new hires".into(),
      items:           vec![
        PerItemLine {
          recipient: Some(RecipientField::Id(7)),
          location:  "HQ".into(),
          qty:       None,
        },
        PerItemLine {
          recipient: Some(RecipientField::Text("unassigned".into())),
          location:  "Plant 2".into(),
          qty:       Some(3),
        },
      ],
    };

    let drafts = expand(&[entry]).unwrap();
    assert_eq!(drafts.len(), 2);
    assert_eq!(drafts[0].requested_recipient, Some(7));
    assert_eq!(drafts[0].location, "HQ");
    assert_eq!(drafts[1].requested_recipient, None);
    assert_eq!(drafts[1].quantity, 3);
    assert!(drafts.iter().all(|d| d.mode == RequestMode::PerItem));
  }

  #[test]
  fn non_numeric_recipient_is_rejected() {
    let err = parse_recipient(Some(&RecipientField::Text("bob".into())))
      .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn unknown_employee_resolves_to_unassigned() {
    let drafts = expand(&[bulk(vec![line("Mouse", None)])]).unwrap();
    let draft = &drafts[0];
    assert_eq!(draft.resolve_recipient(|_| false), Recipient::Unassigned);
    assert_eq!(draft.resolve_recipient(|id| id == 1001), Recipient::Employee(1001));
  }

  #[test]
  fn cart_entry_deserializes_from_tagged_json() {
    let json = serde_json::json!({
      "mode": "bulk",
      "category": "Peripherals",
      "items": [{ "name": "Mouse", "qty": 2 }],
      "recipient": 42,
      "location": "Line 1",
      "purpose": "spare"
    });
    let entry: CartEntry = serde_json::from_value(json).unwrap();
    let drafts = expand(&[entry]).unwrap();
    assert_eq!(drafts[0].requested_recipient, Some(42));
  }
}
