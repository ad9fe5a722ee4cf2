//! Shopping list: normalization, display ordering and the optimistic
//! checked toggle.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;

use crate::api::{endpoints, ApiClient};
use crate::errors::{PopoteError, PopoteResult};
use crate::jsonapi::ListDocument;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShoppingItemAttrs {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub deletable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShoppingItem {
    pub id: String,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    /// Checked state as the server last reported it. The live state is the
    /// [`Checklist`] overlay.
    pub checked: bool,
    /// Items aggregated from the week plan are not individually deletable.
    pub deletable: bool,
}

impl ShoppingItem {
    /// Quantity for display; 0 and null both read as "no quantity".
    pub fn display_quantity(&self) -> Option<f64> {
        self.quantity.filter(|q| *q != 0.0)
    }
}

pub fn normalize_shopping_list(doc: &ListDocument<ShoppingItemAttrs>) -> Vec<ShoppingItem> {
    doc.data
        .iter()
        .map(|res| {
            let attrs = &res.attributes;
            ShoppingItem {
                id: res.id.clone(),
                name: attrs.name.clone(),
                quantity: attrs.quantity,
                unit: attrs.unit.clone(),
                checked: attrs.checked,
                deletable: attrs.deletable,
            }
        })
        .collect()
}

/// Server half of the checked toggle. A seam so the rollback path is
/// testable without a network.
#[async_trait]
pub trait CheckSync: Send + Sync {
    async fn push_checked(&self, name: &str, unit: Option<&str>, checked: bool)
        -> PopoteResult<()>;
}

#[async_trait]
impl CheckSync for ApiClient {
    async fn push_checked(
        &self,
        name: &str,
        unit: Option<&str>,
        checked: bool,
    ) -> PopoteResult<()> {
        let body = serde_json::json!({"name": name, "unit": unit, "checked": checked});
        self.post(endpoints::SHOPPING_LIST_CHECK, &body).await
    }
}

/// Shopping list plus the client-side checked overlay.
///
/// The overlay starts from the server state and is mutated optimistically:
/// a toggle flips it immediately, pushes the change, and flips back if the
/// push fails. Checked items never disappear; they sort to the end.
pub struct Checklist {
    items: Vec<ShoppingItem>,
    checked: HashSet<String>,
}

impl Checklist {
    pub fn new(items: Vec<ShoppingItem>) -> Self {
        let checked = items
            .iter()
            .filter(|item| item.checked)
            .map(|item| item.id.clone())
            .collect();
        Self { items, checked }
    }

    pub fn items(&self) -> &[ShoppingItem] {
        &self.items
    }

    pub fn is_checked(&self, id: &str) -> bool {
        self.checked.contains(id)
    }

    /// Display order: unchecked before checked, ties by case-insensitive
    /// name, stable beyond that.
    pub fn sorted(&self) -> Vec<&ShoppingItem> {
        let mut list: Vec<&ShoppingItem> = self.items.iter().collect();
        list.sort_by(|a, b| {
            self.is_checked(&a.id)
                .cmp(&self.is_checked(&b.id))
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        list
    }

    /// Optimistic toggle: flip the overlay, push to the server, flip back on
    /// failure. Returns the new checked state on success.
    pub async fn toggle<S: CheckSync + ?Sized>(&mut self, id: &str, sync: &S) -> PopoteResult<bool> {
        let item = self
            .items
            .iter()
            .find(|item| item.id == id)
            .ok_or(PopoteError::NotFound)?;

        let will_check = !self.checked.contains(id);
        if will_check {
            self.checked.insert(id.to_string());
        } else {
            self.checked.remove(id);
        }

        match sync
            .push_checked(&item.name, item.unit.as_deref(), will_check)
            .await
        {
            Ok(()) => Ok(will_check),
            Err(err) => {
                tracing::warn!(id = id, error = %err, "checked toggle rejected, rolling back");
                if will_check {
                    self.checked.remove(id);
                } else {
                    self.checked.insert(id.to_string());
                }
                Err(err)
            }
        }
    }
}

impl ApiClient {
    pub async fn fetch_shopping_list(&self) -> PopoteResult<Vec<ShoppingItem>> {
        let doc: ListDocument<ShoppingItemAttrs> = self.get_json(endpoints::SHOPPING_LIST).await?;
        Ok(normalize_shopping_list(&doc))
    }

    pub async fn add_shopping_item(
        &self,
        name: &str,
        quantity: Option<f64>,
        unit: Option<&str>,
    ) -> PopoteResult<()> {
        let mut body = serde_json::json!({"name": name, "unit": unit});
        if let Some(quantity) = quantity {
            body["quantity"] = serde_json::json!(quantity);
        }
        self.post(endpoints::SHOPPING_LIST, &body).await
    }

    /// Items are identified by name/unit, so the DELETE carries a body.
    pub async fn remove_shopping_item(&self, name: &str, unit: Option<&str>) -> PopoteResult<()> {
        let body = serde_json::json!({"name": name, "unit": unit});
        self.delete_with_body(endpoints::SHOPPING_LIST, &body).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn item(id: &str, name: &str, checked: bool) -> ShoppingItem {
        ShoppingItem {
            id: id.into(),
            name: name.into(),
            quantity: None,
            unit: None,
            checked,
            deletable: true,
        }
    }

    struct RecordingSync {
        calls: Mutex<Vec<(String, bool)>>,
        fail: bool,
    }

    impl RecordingSync {
        fn new(fail: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl CheckSync for RecordingSync {
        async fn push_checked(
            &self,
            name: &str,
            _unit: Option<&str>,
            checked: bool,
        ) -> PopoteResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), checked));
            if self.fail {
                Err(PopoteError::Api {
                    status: 500,
                    message: "boom".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn unchecked_items_sort_before_checked_ones() {
        // server order: Lait (checked) then Pain (unchecked)
        let doc: ListDocument<ShoppingItemAttrs> = serde_json::from_str(
            r#"{"data": [
                {"id": "1", "type": "shopping_item", "attributes": {"name": "Lait", "checked": true}},
                {"id": "2", "type": "shopping_item", "attributes": {"name": "Pain", "checked": false}}
            ]}"#,
        )
        .unwrap();
        let list = Checklist::new(normalize_shopping_list(&doc));

        let names: Vec<&str> = list.sorted().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Pain", "Lait"]);
    }

    #[test]
    fn ties_order_by_name_case_insensitively() {
        let list = Checklist::new(vec![
            item("1", "pain", false),
            item("2", "Beurre", false),
            item("3", "Oeufs", false),
        ]);
        let names: Vec<&str> = list.sorted().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Beurre", "Oeufs", "pain"]);
    }

    #[test]
    fn zero_quantity_displays_as_none() {
        let mut it = item("1", "Sel", false);
        assert_eq!(it.display_quantity(), None);
        it.quantity = Some(0.0);
        assert_eq!(it.display_quantity(), None);
        it.quantity = Some(2.0);
        assert_eq!(it.display_quantity(), Some(2.0));
    }

    #[tokio::test]
    async fn toggle_twice_restores_state_with_two_calls() {
        let sync = RecordingSync::new(false);
        let mut list = Checklist::new(vec![item("1", "Lait", false)]);

        assert!(list.toggle("1", &sync).await.unwrap());
        assert!(list.is_checked("1"));
        assert!(!list.toggle("1", &sync).await.unwrap());
        assert!(!list.is_checked("1"));

        let calls = sync.calls.lock().unwrap();
        assert_eq!(*calls, vec![("Lait".to_string(), true), ("Lait".to_string(), false)]);
    }

    #[tokio::test]
    async fn failed_toggle_rolls_back_to_the_previous_state() {
        let sync = RecordingSync::new(true);

        let mut list = Checklist::new(vec![item("1", "Lait", false)]);
        assert!(list.toggle("1", &sync).await.is_err());
        assert!(!list.is_checked("1"));

        // same protocol from the checked side
        let mut list = Checklist::new(vec![item("1", "Lait", true)]);
        assert!(list.toggle("1", &sync).await.is_err());
        assert!(list.is_checked("1"));
    }

    #[tokio::test]
    async fn toggling_an_unknown_id_is_not_found() {
        let sync = RecordingSync::new(false);
        let mut list = Checklist::new(vec![]);
        assert!(matches!(
            list.toggle("ghost", &sync).await,
            Err(PopoteError::NotFound)
        ));
        assert!(sync.calls.lock().unwrap().is_empty());
    }
}
