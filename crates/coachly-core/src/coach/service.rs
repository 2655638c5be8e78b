//! Coach management service.
//!
//! Validates and stores coaches, serves the public catalogue and a creator's
//! private list, and restricts edits and deletion to the creator.

use chrono::Utc;

use coachly_types::coach::{Coach, CoachId, CreateCoachRequest, UpdateCoachRequest};
use coachly_types::error::CoachError;
use coachly_types::user::UserId;

use crate::repository::SortOrder;
use crate::repository::coach::{CoachFilter, CoachRepository, CoachSort};

/// Names of the required text fields that are blank.
fn blank_fields(fields: &[(&'static str, &str)]) -> Vec<&'static str> {
    fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect()
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub struct CoachService<K: CoachRepository> {
    coaches: K,
}

impl<K: CoachRepository> CoachService<K> {
    pub fn new(coaches: K) -> Self {
        Self { coaches }
    }

    /// Create a coach owned by `creator`.
    ///
    /// Name, title, description and system prompt are required, plus at
    /// least one specialty. Nothing is written if validation fails.
    pub async fn create_coach(
        &self,
        creator: UserId,
        request: CreateCoachRequest,
    ) -> Result<Coach, CoachError> {
        let missing = blank_fields(&[
            ("name", request.name.as_str()),
            ("title", request.title.as_str()),
            ("description", request.description.as_str()),
            ("system_prompt", request.system_prompt.as_str()),
        ]);
        if !missing.is_empty() {
            return Err(CoachError::MissingFields(missing.join(", ")));
        }
        let specialties = clean_list(request.specialties);
        if specialties.is_empty() {
            return Err(CoachError::MissingSpecialties);
        }

        let now = Utc::now();
        let coach = Coach {
            id: CoachId::new(),
            creator_id: creator,
            name: request.name.trim().to_string(),
            title: request.title.trim().to_string(),
            description: request.description.trim().to_string(),
            avatar_url: clean_optional(request.avatar_url),
            specialties,
            personality_traits: clean_list(request.personality_traits),
            system_prompt: request.system_prompt.trim().to_string(),
            video_persona_id: clean_optional(request.video_persona_id),
            is_public: request.is_public,
            use_count: 0,
            created_at: now,
            updated_at: now,
        };

        let coach = self.coaches.create(&coach).await?;
        tracing::info!(coach_id = %coach.id, creator_id = %creator, public = coach.is_public, "coach created");
        Ok(coach)
    }

    pub async fn get_coach(&self, id: &CoachId) -> Result<Coach, CoachError> {
        self.coaches.get_by_id(id).await?.ok_or(CoachError::NotFound)
    }

    /// A coach as seen by `viewer`. Other users' private coaches are not found.
    pub async fn get_visible(&self, viewer: &UserId, id: &CoachId) -> Result<Coach, CoachError> {
        let coach = self.get_coach(id).await?;
        if !coach.visible_to(viewer) {
            return Err(CoachError::NotFound);
        }
        Ok(coach)
    }

    /// Public coaches, most used first.
    pub async fn list_public(&self) -> Result<Vec<Coach>, CoachError> {
        let filter = CoachFilter {
            is_public: Some(true),
            sort_by: CoachSort::UseCount,
            sort_order: SortOrder::Desc,
            ..Default::default()
        };
        Ok(self.coaches.list(&filter).await?)
    }

    /// A creator's private coaches, newest first.
    pub async fn list_private(&self, creator: &UserId) -> Result<Vec<Coach>, CoachError> {
        let filter = CoachFilter {
            is_public: Some(false),
            creator_id: Some(*creator),
            sort_by: CoachSort::CreatedAt,
            sort_order: SortOrder::Desc,
            ..Default::default()
        };
        Ok(self.coaches.list(&filter).await?)
    }

    /// Apply the set fields of `request`. Creator only.
    pub async fn update_coach(
        &self,
        actor: &UserId,
        id: &CoachId,
        request: UpdateCoachRequest,
    ) -> Result<Coach, CoachError> {
        let mut coach = self.owned_coach(actor, id).await?;

        let text_updates = [
            ("name", request.name.as_deref()),
            ("title", request.title.as_deref()),
            ("description", request.description.as_deref()),
            ("system_prompt", request.system_prompt.as_deref()),
        ];
        let missing = blank_fields(
            &text_updates
                .iter()
                .filter_map(|(name, value)| value.map(|v| (*name, v)))
                .collect::<Vec<_>>(),
        );
        if !missing.is_empty() {
            return Err(CoachError::MissingFields(missing.join(", ")));
        }

        if let Some(name) = request.name {
            coach.name = name.trim().to_string();
        }
        if let Some(title) = request.title {
            coach.title = title.trim().to_string();
        }
        if let Some(description) = request.description {
            coach.description = description.trim().to_string();
        }
        if let Some(prompt) = request.system_prompt {
            coach.system_prompt = prompt.trim().to_string();
        }
        if let Some(specialties) = request.specialties {
            let specialties = clean_list(specialties);
            if specialties.is_empty() {
                return Err(CoachError::MissingSpecialties);
            }
            coach.specialties = specialties;
        }
        if let Some(traits) = request.personality_traits {
            coach.personality_traits = clean_list(traits);
        }
        if request.avatar_url.is_some() {
            coach.avatar_url = clean_optional(request.avatar_url);
        }
        if request.video_persona_id.is_some() {
            coach.video_persona_id = clean_optional(request.video_persona_id);
        }
        if let Some(is_public) = request.is_public {
            coach.is_public = is_public;
        }
        coach.updated_at = Utc::now();

        let coach = self.coaches.update(&coach).await?;
        tracing::info!(coach_id = %coach.id, "coach updated");
        Ok(coach)
    }

    /// Delete a coach and, through the store, its sessions. Creator only.
    pub async fn delete_coach(&self, actor: &UserId, id: &CoachId) -> Result<(), CoachError> {
        self.owned_coach(actor, id).await?;
        self.coaches.delete(id).await?;
        tracing::info!(coach_id = %id, "coach deleted");
        Ok(())
    }

    async fn owned_coach(&self, actor: &UserId, id: &CoachId) -> Result<Coach, CoachError> {
        let coach = self.get_coach(id).await?;
        if coach.creator_id != *actor {
            return Err(CoachError::NotCreator);
        }
        Ok(coach)
    }
}
