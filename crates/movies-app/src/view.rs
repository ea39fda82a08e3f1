//! View models and their rendering.
//!
//! A rendered view is JSON document `{"view": <name>, "model": <view model>}`.
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use movies_dal::{genre::Genre, movie::Movie};
use serde::{Deserialize, Serialize};

use crate::{
    form::{FieldErrors, MovieFields},
    toast::Toast,
};

pub const MOVIE_LIST_VIEW: &str = "MovieList";
pub const MOVIE_FORM_VIEW: &str = "MovieForm";
pub const MOVIE_DETAILS_VIEW: &str = "MovieDetails";

#[derive(Debug, Serialize, Deserialize)]
pub struct Rendered<T> {
    pub view: String,
    pub model: T,
}

pub struct View<T> {
    status: StatusCode,
    name: &'static str,
    model: T,
}

impl<T: Serialize> View<T> {
    pub fn new(name: &'static str, model: T) -> Self {
        View {
            status: StatusCode::OK,
            name,
            model,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl<T: Serialize> IntoResponse for View<T> {
    fn into_response(self) -> Response {
        let rendered = Rendered {
            view: self.name.to_string(),
            model: self.model,
        };
        (self.status, Json(rendered)).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MovieListView {
    pub movies: Vec<Movie>,
    #[serde(default)]
    pub toasts: Vec<Toast>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MovieFormView {
    #[serde(flatten)]
    pub fields: MovieFields,
    /// Currently stored poster, never the rejected upload
    #[serde(default, with = "movies_dal::poster_bytes::option")]
    pub poster: Option<Vec<u8>>,
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub errors: FieldErrors,
}

impl MovieFormView {
    pub fn new(genres: Vec<Genre>) -> Self {
        MovieFormView {
            genres,
            ..Default::default()
        }
    }

    pub fn from_movie(movie: &Movie, genres: Vec<Genre>) -> Self {
        MovieFormView {
            fields: movie.into(),
            poster: Some(movie.poster.clone()),
            genres,
            errors: FieldErrors::default(),
        }
    }

    /// Redisplay of submitted values which failed validation
    pub fn invalid(
        fields: MovieFields,
        poster: Option<Vec<u8>>,
        genres: Vec<Genre>,
        errors: FieldErrors,
    ) -> Self {
        MovieFormView {
            fields,
            poster,
            genres,
            errors,
        }
    }

    pub fn render(self) -> View<Self> {
        let status = if self.errors.is_empty() {
            StatusCode::OK
        } else {
            StatusCode::UNPROCESSABLE_ENTITY
        };
        View::new(MOVIE_FORM_VIEW, self).with_status(status)
    }
}
