//! Recipe view models, list/detail normalizers and the multipart
//! create/update payload.

use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::api::{endpoints, ApiClient};
use crate::errors::PopoteResult;
use crate::jsonapi::{of_kind, ListDocument, OneDocument, Resource};

/// The server sends the taste either as its string name or as the numeric
/// enum value (0/1). Anything unrecognized reads as `Salt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Taste {
    #[default]
    Salt,
    Sugar,
}

impl Taste {
    fn from_wire(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) if n.as_i64() == Some(1) => Taste::Sugar,
            serde_json::Value::String(s) if s == "sugar" => Taste::Sugar,
            _ => Taste::Salt,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Taste::Salt => "salt",
            Taste::Sugar => "sugar",
        }
    }
}

impl<'de> Deserialize<'de> for Taste {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Taste::from_wire(&value))
    }
}

/// Wire attributes of a recipe resource.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeAttrs {
    pub title: String,
    #[serde(default)]
    pub made_by_mom: bool,
    #[serde(default)]
    pub taste: Taste,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Display-ready recipe summary.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    pub made_by_mom: bool,
    pub taste: Taste,
    pub created_at: Option<DateTime<Utc>>,
    /// Absolute URL, resolved against the base URL when the server sent a
    /// relative path.
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct IngredientAttrs {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct StepAttrs {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub position: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub id: String,
    pub description: String,
    /// 1-based on the server; `None` sorts as 0.
    pub position: Option<i64>,
}

/// Recipe plus its ingredient and step collections from `included`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDetail {
    pub recipe: Recipe,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<Step>,
}

pub(crate) fn resolve_image_url(base_url: &str, raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with("http") {
        Some(raw.to_string())
    } else {
        Some(format!("{base_url}{raw}"))
    }
}

pub fn normalize_recipe(base_url: &str, resource: &Resource<RecipeAttrs>) -> Recipe {
    let attrs = &resource.attributes;
    Recipe {
        id: resource.id.clone(),
        title: attrs.title.clone(),
        made_by_mom: attrs.made_by_mom,
        taste: attrs.taste,
        created_at: attrs.created_at,
        image_url: resolve_image_url(base_url, attrs.image_url.as_deref()),
    }
}

pub fn normalize_recipe_list(base_url: &str, doc: &ListDocument<RecipeAttrs>) -> Vec<Recipe> {
    doc.data
        .iter()
        .map(|resource| normalize_recipe(base_url, resource))
        .collect()
}

/// Flatten a single-recipe envelope: ingredients and steps come from the
/// `included` side array, steps ordered by position (missing reads as 0,
/// ties keep response order).
pub fn normalize_recipe_detail(base_url: &str, doc: &OneDocument<RecipeAttrs>) -> RecipeDetail {
    let recipe = normalize_recipe(base_url, &doc.data);

    let ingredients = of_kind(&doc.included, "ingredient")
        .filter_map(|res| match res.attributes_as::<IngredientAttrs>() {
            Ok(attrs) => Some(Ingredient {
                id: res.id.clone(),
                name: attrs.name,
                quantity: attrs.quantity,
                unit: attrs.unit,
            }),
            Err(err) => {
                tracing::warn!(id = %res.id, error = %err, "skipping malformed ingredient");
                None
            }
        })
        .collect();

    let mut steps: Vec<Step> = of_kind(&doc.included, "step")
        .filter_map(|res| match res.attributes_as::<StepAttrs>() {
            Ok(attrs) => Some(Step {
                id: res.id.clone(),
                description: attrs.description,
                position: attrs.position,
            }),
            Err(err) => {
                tracing::warn!(id = %res.id, error = %err, "skipping malformed step");
                None
            }
        })
        .collect();
    steps.sort_by_key(|step| step.position.unwrap_or(0));

    RecipeDetail {
        recipe,
        ingredients,
        steps,
    }
}

/// Editable ingredient row of a draft. `id` is set when the row already
/// exists server-side.
#[derive(Debug, Clone, Default)]
pub struct IngredientRow {
    pub id: Option<String>,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StepRow {
    pub id: Option<String>,
    pub description: String,
}

/// Image picked for upload.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Create/update payload for a recipe, encoded as the multipart form the
/// server's nested-attributes endpoints accept.
#[derive(Debug, Clone, Default)]
pub struct RecipeDraft {
    pub title: String,
    pub made_by_mom: bool,
    pub taste: Taste,
    pub ingredients: Vec<IngredientRow>,
    /// Existing ingredient ids removed in the editor; sent as `_destroy` rows.
    pub deleted_ingredient_ids: Vec<String>,
    pub steps: Vec<StepRow>,
    pub deleted_step_ids: Vec<String>,
    pub image: Option<ImageAttachment>,
    pub remove_image: bool,
}

impl RecipeDraft {
    /// Text fields of the multipart body, in submission order. Nested
    /// collections use bracketed array-index naming; deletions follow the
    /// kept rows with a `_destroy` flag. Blank-named rows are dropped and
    /// steps are repositioned 1..=N over what remains.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("recipe[title]".to_string(), self.title.trim().to_string()),
            (
                "recipe[made_by_mom]".to_string(),
                self.made_by_mom.to_string(),
            ),
            ("recipe[taste]".to_string(), self.taste.as_str().to_string()),
        ];

        let mut idx = 0;
        for row in &self.ingredients {
            let name = row.name.trim();
            if name.is_empty() {
                continue;
            }
            let key = |field: &str| format!("recipe[ingredients_attributes][{idx}][{field}]");
            if let Some(id) = &row.id {
                fields.push((key("id"), id.clone()));
            }
            fields.push((key("name"), name.to_string()));
            if let Some(unit) = row.unit.as_deref().filter(|u| !u.is_empty()) {
                fields.push((key("unit"), unit.to_string()));
            }
            if let Some(quantity) = row.quantity {
                fields.push((key("quantity"), format!("{quantity}")));
            }
            idx += 1;
        }
        for id in &self.deleted_ingredient_ids {
            let key = |field: &str| format!("recipe[ingredients_attributes][{idx}][{field}]");
            fields.push((key("id"), id.clone()));
            fields.push((key("_destroy"), "true".to_string()));
            idx += 1;
        }

        let mut idx = 0;
        for row in &self.steps {
            let description = row.description.trim();
            if description.is_empty() {
                continue;
            }
            let key = |field: &str| format!("recipe[steps_attributes][{idx}][{field}]");
            if let Some(id) = &row.id {
                fields.push((key("id"), id.clone()));
            }
            fields.push((key("description"), description.to_string()));
            fields.push((key("position"), (idx + 1).to_string()));
            idx += 1;
        }
        for id in &self.deleted_step_ids {
            let key = |field: &str| format!("recipe[steps_attributes][{idx}][{field}]");
            fields.push((key("id"), id.clone()));
            fields.push((key("_destroy"), "true".to_string()));
            idx += 1;
        }

        if self.remove_image {
            fields.push(("recipe[remove_image]".to_string(), "true".to_string()));
        }

        fields
    }

    pub fn into_multipart(self) -> PopoteResult<Form> {
        let mut form = Form::new();
        for (name, value) in self.form_fields() {
            form = form.text(name, value);
        }
        if let Some(image) = self.image {
            let part = Part::bytes(image.bytes)
                .file_name(image.file_name)
                .mime_str(&image.mime_type)?;
            form = form.part("recipe[image]", part);
        }
        Ok(form)
    }
}

impl ApiClient {
    pub async fn list_recipes(&self) -> PopoteResult<Vec<Recipe>> {
        let doc: ListDocument<RecipeAttrs> = self.get_json(endpoints::RECIPES).await?;
        Ok(normalize_recipe_list(self.base_url(), &doc))
    }

    pub async fn get_recipe(&self, id: &str) -> PopoteResult<RecipeDetail> {
        let path = format!("{}/{id}", endpoints::RECIPES);
        let doc: OneDocument<RecipeAttrs> = self.get_json(&path).await?;
        Ok(normalize_recipe_detail(self.base_url(), &doc))
    }

    pub async fn create_recipe(&self, draft: RecipeDraft) -> PopoteResult<RecipeDetail> {
        let form = draft.into_multipart()?;
        let doc: OneDocument<RecipeAttrs> =
            self.post_multipart_json(endpoints::RECIPES, form).await?;
        Ok(normalize_recipe_detail(self.base_url(), &doc))
    }

    pub async fn update_recipe(&self, id: &str, draft: RecipeDraft) -> PopoteResult<()> {
        let path = format!("{}/{id}", endpoints::RECIPES);
        self.put_multipart(&path, draft.into_multipart()?).await
    }

    pub async fn delete_recipe(&self, id: &str) -> PopoteResult<()> {
        let path = format!("{}/{id}", endpoints::RECIPES);
        self.delete(&path).await
    }
}
