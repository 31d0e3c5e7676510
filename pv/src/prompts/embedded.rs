//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time, together
//! with the slots each template must use. Overrides have to honour the same slots.

use tracing::debug;

/// An embedded template and its slot contract
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedPrompt {
    pub name: &'static str,
    pub source: &'static str,
    pub slots: &'static [&'static str],
}

pub const MASTER_SYSTEM: &str = include_str!("../../prompts/master-system.pmt");
pub const HISTORIAN_SYSTEM: &str = include_str!("../../prompts/historian-system.pmt");
pub const HISTORIAN_USER: &str = include_str!("../../prompts/historian-user.pmt");
pub const TOUR_GUIDE_SYSTEM: &str = include_str!("../../prompts/tour-guide-system.pmt");
pub const TOUR_GUIDE_USER: &str = include_str!("../../prompts/tour-guide-user.pmt");
pub const PLANNER_SYSTEM: &str = include_str!("../../prompts/itinerary-planner-system.pmt");
pub const PLANNER_USER: &str = include_str!("../../prompts/itinerary-planner-user.pmt");
pub const PHOTO_DIRECTOR_SYSTEM: &str = include_str!("../../prompts/photo-director-system.pmt");
pub const PHOTO_DIRECTOR_USER: &str = include_str!("../../prompts/photo-director-user.pmt");
pub const IMAGE_PRESERVATION: &str = include_str!("../../prompts/image-preservation.pmt");
pub const STUDIO_PHOTO: &str = include_str!("../../prompts/studio-photo.pmt");

/// Every template the service uses
pub const PROMPTS: &[EmbeddedPrompt] = &[
    EmbeddedPrompt {
        name: "master-system",
        source: MASTER_SYSTEM,
        slots: &[],
    },
    EmbeddedPrompt {
        name: "historian-system",
        source: HISTORIAN_SYSTEM,
        slots: &["location"],
    },
    EmbeddedPrompt {
        name: "historian-user",
        source: HISTORIAN_USER,
        slots: &["location"],
    },
    EmbeddedPrompt {
        name: "tour-guide-system",
        source: TOUR_GUIDE_SYSTEM,
        slots: &["location"],
    },
    EmbeddedPrompt {
        name: "tour-guide-user",
        source: TOUR_GUIDE_USER,
        slots: &["persona", "location"],
    },
    EmbeddedPrompt {
        name: "itinerary-planner-system",
        source: PLANNER_SYSTEM,
        slots: &["location"],
    },
    EmbeddedPrompt {
        name: "itinerary-planner-user",
        source: PLANNER_USER,
        slots: &["persona", "history", "guide", "days", "location"],
    },
    EmbeddedPrompt {
        name: "photo-director-system",
        source: PHOTO_DIRECTOR_SYSTEM,
        slots: &[],
    },
    EmbeddedPrompt {
        name: "photo-director-user",
        source: PHOTO_DIRECTOR_USER,
        slots: &[],
    },
    EmbeddedPrompt {
        name: "image-preservation",
        source: IMAGE_PRESERVATION,
        slots: &["prompt"],
    },
    EmbeddedPrompt {
        name: "studio-photo",
        source: STUDIO_PHOTO,
        slots: &["prompt"],
    },
];

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static EmbeddedPrompt> {
    debug!(%name, "get_embedded: called");
    let found = PROMPTS.iter().find(|p| p.name == name);
    if found.is_none() {
        debug!("get_embedded: no match found");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::PromptTemplate;

    #[test]
    fn test_get_embedded_master() {
        let master = get_embedded("master-system").unwrap();
        assert!(master.source.contains("Historian Agent"));
        assert!(master.source.contains("Tour Guide Agent"));
        assert!(master.source.contains("Itinerary Planner Agent"));
        assert!(master.source.contains("Language Translator Agent"));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }

    #[test]
    fn test_every_embedded_prompt_honours_its_slots() {
        for prompt in PROMPTS {
            let result = PromptTemplate::new(prompt.name, prompt.source, prompt.slots);
            assert!(result.is_ok(), "{} failed: {:?}", prompt.name, result.err());
        }
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = PROMPTS.iter().map(|p| p.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), PROMPTS.len());
    }
}
