//! Week planning: scheduled-recipe normalization into a fixed 7-day table.

use serde::Deserialize;

use crate::api::{endpoints, ApiClient};
use crate::errors::PopoteResult;
use crate::jsonapi::{IncludedIndex, ListDocument};

pub const DAYS_PER_WEEK: usize = 7;

/// Display labels, Monday first.
pub const DAY_LABELS: [&str; DAYS_PER_WEEK] = [
    "Lundi", "Mardi", "Mercredi", "Jeudi", "Vendredi", "Samedi", "Dimanche",
];

/// The server sends `day_of_week` either as a number (Monday = 0) or as an
/// English weekday name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DayValue {
    Number(i64),
    Name(String),
}

impl DayValue {
    /// Normalized day index. Names map case-insensitively through one
    /// table; unrecognized names read as Monday. Numbers pass through
    /// unchanged and are range-checked by the week normalizer.
    pub fn index(&self) -> i64 {
        match self {
            DayValue::Number(n) => *n,
            DayValue::Name(name) => match name.to_lowercase().as_str() {
                "monday" => 0,
                "tuesday" => 1,
                "wednesday" => 2,
                "thursday" => 3,
                "friday" => 4,
                "saturday" => 5,
                "sunday" => 6,
                other => {
                    tracing::warn!(day = other, "unrecognized weekday name, reading as monday");
                    0
                }
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledRecipeAttrs {
    pub day_of_week: DayValue,
}

/// One display slot of the week table.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySlot {
    /// Server id of the scheduled record, or a synthetic `new-{day}` id for
    /// days with nothing planned.
    pub id: String,
    pub day: usize,
    pub recipe_id: Option<String>,
    pub recipe_title: Option<String>,
}

impl DaySlot {
    fn placeholder(day: usize) -> Self {
        Self {
            id: format!("new-{day}"),
            day,
            recipe_id: None,
            recipe_title: None,
        }
    }

    pub fn has_recipe(&self) -> bool {
        self.recipe_id.is_some()
    }

    pub fn label(&self) -> &'static str {
        DAY_LABELS[self.day]
    }
}

/// A full week: always exactly 7 slots, Monday-indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekPlan {
    pub slots: [DaySlot; DAYS_PER_WEEK],
}

impl WeekPlan {
    pub fn slot(&self, day: usize) -> Option<&DaySlot> {
        self.slots.get(day)
    }
}

/// Build the day-indexed table from a scheduled-recipes envelope.
///
/// Recipe titles resolve through the `included` side table; days with no
/// record get a placeholder; records whose numeric day falls outside the
/// week are skipped; later records for the same day replace earlier ones.
pub fn normalize_week(doc: &ListDocument<ScheduledRecipeAttrs>) -> WeekPlan {
    let index = IncludedIndex::new(&doc.included);
    let mut by_day: [Option<DaySlot>; DAYS_PER_WEEK] = Default::default();

    for resource in &doc.data {
        let day = resource.attributes.day_of_week.index();
        if !(0..DAYS_PER_WEEK as i64).contains(&day) {
            tracing::warn!(id = %resource.id, day, "scheduled recipe outside the week, skipping");
            continue;
        }
        let day = day as usize;

        let recipe_id = resource.related_id("recipe").map(str::to_string);
        let recipe_title = recipe_id
            .as_deref()
            .and_then(|id| index.get("recipe", id))
            .and_then(|recipe| recipe.attr_str("title"))
            .map(str::to_string);

        by_day[day] = Some(DaySlot {
            id: resource.id.clone(),
            day,
            recipe_id,
            recipe_title,
        });
    }

    WeekPlan {
        slots: std::array::from_fn(|day| {
            by_day[day]
                .take()
                .unwrap_or_else(|| DaySlot::placeholder(day))
        }),
    }
}

impl ApiClient {
    pub async fn fetch_week(&self) -> PopoteResult<WeekPlan> {
        let doc: ListDocument<ScheduledRecipeAttrs> =
            self.get_json(endpoints::SCHEDULED_RECIPES).await?;
        Ok(normalize_week(&doc))
    }

    pub async fn assign_recipe(&self, day: usize, recipe_id: &str) -> PopoteResult<()> {
        let body = serde_json::json!({
            "scheduled_recipe": {"day_of_week": day, "recipe_id": recipe_id}
        });
        self.post(endpoints::SCHEDULED_RECIPES, &body).await
    }

    pub async fn unschedule(&self, slot_id: &str) -> PopoteResult<()> {
        let path = format!("{}/{slot_id}", endpoints::SCHEDULED_RECIPES);
        self.delete(&path).await
    }

    /// Wipes the whole week. Destructive; callers confirm with the user
    /// before invoking.
    pub async fn clear_week(&self) -> PopoteResult<()> {
        self.delete(endpoints::SCHEDULED_RECIPES_CLEAR).await
    }
}
