//! Binding of submitted movie forms (multipart) into validated fields and field errors.
use std::collections::{BTreeMap, HashMap};

use axum::extract::{multipart::MultipartError, Multipart};
use garde::Validate;
use http::StatusCode;
use movies_dal::movie::{CreateMovie, Movie, UpdateMovie};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::poster::{PosterError, PosterPolicy, UploadedPoster};

pub const POSTER_FIELD: &str = "poster";

fn not_blank(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        Err(garde::Error::new("must not be blank"))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct MovieFields {
    #[garde(skip)]
    pub id: Option<i64>,
    #[garde(length(chars, min = 1, max = 250), custom(not_blank))]
    pub name: String,
    #[garde(skip)]
    pub year: i64,
    #[garde(range(min = 1.0, max = 10.0))]
    pub rate: f64,
    #[garde(length(chars, min = 1, max = 2500), custom(not_blank))]
    pub story_line: String,
    #[garde(range(min = 1))]
    pub genre_id: i64,
}

impl From<&Movie> for MovieFields {
    fn from(movie: &Movie) -> Self {
        MovieFields {
            id: Some(movie.id),
            name: movie.name.clone(),
            year: movie.year,
            rate: movie.rate,
            story_line: movie.story_line.clone(),
            genre_id: movie.genre_id,
        }
    }
}

impl MovieFields {
    pub fn into_create(self, poster: Vec<u8>) -> CreateMovie {
        CreateMovie {
            name: self.name,
            year: self.year,
            rate: self.rate,
            story_line: self.story_line,
            poster,
            genre_id: self.genre_id,
        }
    }

    pub fn into_update(self, poster: Option<Vec<u8>>) -> UpdateMovie {
        UpdateMovie {
            name: self.name,
            year: self.year,
            rate: self.rate,
            story_line: self.story_line,
            poster,
            genre_id: self.genre_id,
        }
    }
}

/// Field scoped error messages, keyed by form field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(|v| v.as_slice())
    }

    /// Adds validation report, skipping fields which already failed binding
    fn merge_report(&mut self, report: &garde::Report) {
        let bound_errors: Vec<String> = self.0.keys().cloned().collect();
        for (path, error) in report.iter() {
            let field = path.to_string();
            if !bound_errors.contains(&field) {
                self.add(field, error.message());
            }
        }
    }
}

fn is_body_limit(e: &MultipartError) -> bool {
    e.status() == StatusCode::PAYLOAD_TOO_LARGE
}

fn display_name(field: &str) -> &str {
    match field {
        "name" => "Name",
        "year" => "Year",
        "rate" => "Rate",
        "story_line" => "Story line",
        "genre_id" => "Genre",
        "id" => "Id",
        other => other,
    }
}

/// Raw values of submitted text fields, before conversion
#[derive(Debug, Default)]
struct RawForm(HashMap<String, String>);

impl RawForm {
    fn insert(&mut self, name: String, value: String) {
        self.0.insert(name, value);
    }

    fn value(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    fn required_text(&self, field: &str, errors: &mut FieldErrors) -> String {
        match self.0.get(field) {
            Some(value) if !value.trim().is_empty() => value.clone(),
            _ => {
                errors.add(field, format!("The {} field is required.", display_name(field)));
                String::new()
            }
        }
    }

    fn required_number<T>(&self, field: &str, errors: &mut FieldErrors) -> T
    where
        T: std::str::FromStr + Default,
    {
        match self.value(field) {
            Some(value) => self.parse_number(field, value, errors).unwrap_or_default(),
            None => {
                errors.add(field, format!("The {} field is required.", display_name(field)));
                T::default()
            }
        }
    }

    fn optional_number<T>(&self, field: &str, errors: &mut FieldErrors) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.value(field)
            .and_then(|value| self.parse_number(field, value, errors))
    }

    fn parse_number<T>(&self, field: &str, value: &str, errors: &mut FieldErrors) -> Option<T>
    where
        T: std::str::FromStr,
    {
        let parsed = value.parse::<T>().ok();
        // NaN and infinity parse as f64 but are not valid form input
        let finite = value.parse::<f64>().map(f64::is_finite).unwrap_or(true);
        match parsed {
            Some(v) if finite => Some(v),
            _ => {
                errors.add(
                    field,
                    format!(
                        "The value '{}' is not valid for {}.",
                        value,
                        display_name(field)
                    ),
                );
                None
            }
        }
    }
}

/// Submitted movie form: converted fields, first attached file and errors found so far
#[derive(Debug)]
pub struct MovieSubmission {
    pub fields: MovieFields,
    pub poster: Option<UploadedPoster>,
    pub errors: FieldErrors,
}

impl MovieSubmission {
    /// Reads whole multipart body.
    ///
    /// The first part carrying a non empty file name is the poster, it is staged
    /// according to `policy`; other file parts are skipped.
    /// Once the poster is rejected, hitting the request body limit ends the input,
    /// so the poster is reported as a field error rather than as a failed request.
    pub async fn from_multipart(
        multipart: &mut Multipart,
        policy: &PosterPolicy,
    ) -> Result<Self, MultipartError> {
        let mut raw = RawForm::default();
        let mut poster: Option<UploadedPoster> = None;
        loop {
            let poster_rejected = poster.as_ref().is_some_and(UploadedPoster::is_rejected);
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) if poster_rejected && is_body_limit(&e) => {
                    debug!("Body limit reached after rejected poster, ignoring rest of form");
                    break;
                }
                Err(e) => return Err(e),
            };
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(|s| s.to_string()) {
                Some(file_name) if !file_name.is_empty() => {
                    if poster.is_some() {
                        debug!("Ignoring additional file {file_name} in field {name}");
                        continue;
                    }
                    match policy.stage(file_name.clone(), field).await {
                        Ok(staged) => poster = Some(staged),
                        Err(e) if is_body_limit(&e) => {
                            debug!("Body limit reached while reading poster {file_name}");
                            let rejected = UploadedPoster::rejected(file_name, PosterError::TooLarge);
                            poster = Some(rejected);
                            break;
                        }
                        Err(e) => return Err(e),
                    }
                }
                Some(_) => debug!("Empty file input {name}"),
                None => match field.text().await {
                    Ok(value) => raw.insert(name, value),
                    Err(e) if poster_rejected && is_body_limit(&e) => break,
                    Err(e) => return Err(e),
                },
            }
        }
        Ok(Self::from_raw(raw, poster))
    }

    fn from_raw(raw: RawForm, poster: Option<UploadedPoster>) -> Self {
        let mut errors = FieldErrors::default();
        let fields = MovieFields {
            id: raw.optional_number("id", &mut errors),
            name: raw.required_text("name", &mut errors),
            year: raw.required_number("year", &mut errors),
            rate: raw.required_number("rate", &mut errors),
            story_line: raw.required_text("story_line", &mut errors),
            genre_id: raw.required_number("genre_id", &mut errors),
        };
        if let Err(report) = fields.validate() {
            errors.merge_report(&report);
        }
        MovieSubmission {
            fields,
            poster,
            errors,
        }
    }

    /// Structural validity of the text fields, poster is validated separately
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}
