use crate::config::{MentorMode, Mentor, Settings};
use crate::error::AppError;
use crate::oracle::Oracle;
use rand::Rng;
use rand::seq::SliceRandom;
use ulid::Ulid;

const BUILT_IN_QUOTE: &str = "Discipline is the bridge between goals and accomplishment.";

fn required(text: &str, what: &str) -> Result<String, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input(format!("{what} is required")));
    }
    Ok(trimmed.to_string())
}

fn find_mut<'a>(settings: &'a mut Settings, id: &str) -> Option<&'a mut Mentor> {
    let trimmed = id.trim();
    settings.mentors.iter_mut().find(|mentor| mentor.id == trimmed)
}

pub fn active_mentor(settings: &Settings) -> Option<&Mentor> {
    settings
        .mentors
        .iter()
        .find(|mentor| mentor.id == settings.active_mentor_id)
        .or_else(|| settings.mentors.first())
}

pub fn add_mentor(
    settings: &mut Settings,
    name: &str,
    photo: Option<String>,
) -> Result<Mentor, AppError> {
    let mentor = Mentor {
        id: format!("mentor-{}", Ulid::new().to_string().to_lowercase()),
        name: required(name, "mentor name")?,
        photo,
        quotes: Vec::new(),
        is_default: false,
    };
    settings.mentors.push(mentor.clone());
    Ok(mentor)
}

pub fn rename_mentor(
    settings: &mut Settings,
    id: &str,
    name: &str,
) -> Result<Option<Mentor>, AppError> {
    let name = required(name, "mentor name")?;
    Ok(find_mut(settings, id).map(|mentor| {
        mentor.name = name;
        mentor.clone()
    }))
}

/// Removes a custom mentor. Removing the active one activates the first left.
pub fn remove_mentor(settings: &mut Settings, id: &str) -> Result<Option<Mentor>, AppError> {
    let trimmed = id.trim();
    let Some(index) = settings.mentors.iter().position(|mentor| mentor.id == trimmed) else {
        return Ok(None);
    };
    if settings.mentors[index].is_default {
        return Err(AppError::invalid_input(format!(
            "{} is a default mentor and cannot be removed",
            settings.mentors[index].name
        )));
    }

    let removed = settings.mentors.remove(index);
    if settings.active_mentor_id == removed.id {
        settings.active_mentor_id = settings
            .mentors
            .first()
            .map(|mentor| mentor.id.clone())
            .unwrap_or_default();
    }
    Ok(Some(removed))
}

pub fn add_quote(
    settings: &mut Settings,
    id: &str,
    quote: &str,
) -> Result<Option<Mentor>, AppError> {
    let quote = required(quote, "quote")?;
    Ok(find_mut(settings, id).map(|mentor| {
        mentor.quotes.push(quote);
        mentor.clone()
    }))
}

/// `index` is zero-based, in the order quotes were added.
pub fn remove_quote(
    settings: &mut Settings,
    id: &str,
    index: usize,
) -> Result<Option<Mentor>, AppError> {
    let Some(mentor) = find_mut(settings, id) else {
        return Ok(None);
    };
    if index >= mentor.quotes.len() {
        return Err(AppError::invalid_input(format!(
            "{} has no quote #{}",
            mentor.name,
            index + 1
        )));
    }
    mentor.quotes.remove(index);
    Ok(Some(mentor.clone()))
}

pub fn activate(settings: &mut Settings, id: &str) -> Option<Mentor> {
    let mentor = find_mut(settings, id)?.clone();
    settings.active_mentor_id = mentor.id.clone();
    Some(mentor)
}

pub fn pick_mentor<'a, R: Rng + ?Sized>(settings: &'a Settings, rng: &mut R) -> Option<&'a Mentor> {
    match settings.mentor_mode {
        MentorMode::Selected => active_mentor(settings),
        MentorMode::Random => settings.mentors.choose(rng),
    }
}

/// Manual quotes win over the oracle.
pub fn mentor_quote<R: Rng + ?Sized>(settings: &Settings, oracle: &dyn Oracle, rng: &mut R) -> String {
    let Some(mentor) = pick_mentor(settings, rng) else {
        return BUILT_IN_QUOTE.to_string();
    };

    if let Some(quote) = mentor.quotes.choose(rng) {
        return format!("{quote} - {}", mentor.name);
    }

    match oracle.personalized_quote(&mentor.name) {
        Ok(text) if text.contains(&mentor.name) => text.trim().to_string(),
        Ok(_) => format!("Stay focused and never give up. - {}", mentor.name),
        Err(err) => {
            tracing::warn!(error = %err, mentor = %mentor.name, "quote unavailable");
            format!(
                "Hard work beats talent when talent doesn't work hard. - {}",
                mentor.name
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        activate, add_mentor, add_quote, mentor_quote, pick_mentor, remove_mentor, remove_quote,
        rename_mentor,
    };
    use crate::config::{DEFAULT_MENTOR_ID, MentorMode, Settings};
    use crate::error::AppError;
    use crate::oracle::testing::ScriptedOracle;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn add_rename_and_remove_custom_mentor() {
        let mut settings = Settings::default();
        let mentor = add_mentor(&mut settings, "  Serena Williams ", None).unwrap();
        assert_eq!(mentor.name, "Serena Williams");
        assert!(mentor.id.starts_with("mentor-"));

        let renamed = rename_mentor(&mut settings, &mentor.id, "Serena").unwrap().unwrap();
        assert_eq!(renamed.name, "Serena");

        let removed = remove_mentor(&mut settings, &mentor.id).unwrap().unwrap();
        assert_eq!(removed.id, mentor.id);
        assert_eq!(settings.mentors.len(), 1);
        assert!(remove_mentor(&mut settings, &mentor.id).unwrap().is_none());
    }

    #[test]
    fn blank_names_and_quotes_are_rejected() {
        let mut settings = Settings::default();
        assert!(add_mentor(&mut settings, "  ", None).is_err());
        assert!(rename_mentor(&mut settings, DEFAULT_MENTOR_ID, "").is_err());
        assert!(add_quote(&mut settings, DEFAULT_MENTOR_ID, "\t").is_err());
    }

    #[test]
    fn default_mentor_cannot_be_removed() {
        let mut settings = Settings::default();
        let err = remove_mentor(&mut settings, DEFAULT_MENTOR_ID).unwrap_err();

        assert_eq!(err.code(), "invalid_input");
        assert_eq!(settings.mentors.len(), 1);
    }

    #[test]
    fn removing_active_mentor_falls_back_to_first() {
        let mut settings = Settings::default();
        let mentor = add_mentor(&mut settings, "Kobe", None).unwrap();
        activate(&mut settings, &mentor.id).unwrap();

        remove_mentor(&mut settings, &mentor.id).unwrap();

        assert_eq!(settings.active_mentor_id, DEFAULT_MENTOR_ID);
    }

    #[test]
    fn quotes_are_added_and_removed_by_index() {
        let mut settings = Settings::default();
        add_quote(&mut settings, DEFAULT_MENTOR_ID, "first").unwrap();
        add_quote(&mut settings, DEFAULT_MENTOR_ID, "second").unwrap();

        let mentor = remove_quote(&mut settings, DEFAULT_MENTOR_ID, 0).unwrap().unwrap();
        assert_eq!(mentor.quotes, vec!["second"]);
        assert!(remove_quote(&mut settings, DEFAULT_MENTOR_ID, 5).is_err());
    }

    #[test]
    fn manual_quotes_skip_the_oracle() {
        let mut settings = Settings::default();
        add_quote(&mut settings, DEFAULT_MENTOR_ID, "Keep going.").unwrap();
        let oracle = ScriptedOracle::default();

        let quote = mentor_quote(&settings, &oracle, &mut rng());

        assert_eq!(quote, "Keep going. - Virat Kohli");
    }

    #[test]
    fn oracle_quote_must_name_the_mentor() {
        let settings = Settings::default();
        let named = ScriptedOracle {
            quote: Some(Ok("Never settle. - Virat Kohli".to_string())),
            ..ScriptedOracle::default()
        };
        let anonymous = ScriptedOracle {
            quote: Some(Ok("Never settle.".to_string())),
            ..ScriptedOracle::default()
        };
        let failing = ScriptedOracle {
            quote: Some(Err(AppError::oracle("offline"))),
            ..ScriptedOracle::default()
        };

        assert_eq!(
            mentor_quote(&settings, &named, &mut rng()),
            "Never settle. - Virat Kohli"
        );
        assert_eq!(
            mentor_quote(&settings, &anonymous, &mut rng()),
            "Stay focused and never give up. - Virat Kohli"
        );
        assert_eq!(
            mentor_quote(&settings, &failing, &mut rng()),
            "Hard work beats talent when talent doesn't work hard. - Virat Kohli"
        );
    }

    #[test]
    fn random_mode_picks_from_the_whole_roster() {
        let mut settings = Settings {
            mentor_mode: MentorMode::Random,
            ..Settings::default()
        };
        add_mentor(&mut settings, "Kobe", None).unwrap();
        let mut rng = rng();

        let picked: Vec<String> = (0..32)
            .filter_map(|_| pick_mentor(&settings, &mut rng).map(|mentor| mentor.name.clone()))
            .collect();

        assert!(picked.iter().any(|name| name == "Kobe"));
        assert!(picked.iter().any(|name| name == "Virat Kohli"));
    }

    #[test]
    fn empty_roster_uses_built_in_quote() {
        let settings = Settings {
            mentors: Vec::new(),
            ..Settings::default()
        };
        let quote = mentor_quote(&settings, &ScriptedOracle::default(), &mut rng());
        assert!(!quote.is_empty());
    }
}
