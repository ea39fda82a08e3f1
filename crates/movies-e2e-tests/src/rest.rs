use anyhow::Result;
use movies_app::view::{MovieFormView, MovieListView, Rendered};
use movies_dal::genre::Genre;
use reqwest::{Response, Url, multipart};

/// JPEG signature followed by filler, enough for content sniffing
pub fn jpeg_bytes(size: usize) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];
    data.extend((data.len()..size).map(|i| (i % 251) as u8));
    data.truncate(size);
    data
}

#[derive(Debug, Clone)]
pub struct MovieInput<'a> {
    pub name: &'a str,
    pub year: i64,
    pub rate: f64,
    pub story_line: &'a str,
    pub genre_id: i64,
}

impl<'a> MovieInput<'a> {
    pub fn new(name: &'a str, rate: f64) -> Self {
        MovieInput {
            name,
            year: 2000,
            rate,
            story_line: "Some story",
            genre_id: 3,
        }
    }

    pub fn form(&self) -> multipart::Form {
        multipart::Form::new()
            .text("name", self.name.to_string())
            .text("year", self.year.to_string())
            .text("rate", self.rate.to_string())
            .text("story_line", self.story_line.to_string())
            .text("genre_id", self.genre_id.to_string())
    }

    pub fn form_with_poster(&self, file_name: &str, data: Vec<u8>) -> multipart::Form {
        self.form().part(
            "poster",
            multipart::Part::bytes(data).file_name(file_name.to_string()),
        )
    }
}

pub async fn submit(
    client: &reqwest::Client,
    base_url: &Url,
    path: &str,
    form: multipart::Form,
) -> Result<Response> {
    let url = base_url.join(path)?;
    let response = client.post(url).multipart(form).send().await?;
    Ok(response)
}

/// Creates movie through form, following redirect to the list
pub async fn create_movie(
    client: &reqwest::Client,
    base_url: &Url,
    input: &MovieInput<'_>,
    poster: Vec<u8>,
) -> Result<Rendered<MovieListView>> {
    let response = submit(
        client,
        base_url,
        "movies/create",
        input.form_with_poster("poster.jpg", poster),
    )
    .await?;
    anyhow::ensure!(
        response.status().is_success(),
        "Create failed with {}",
        response.status()
    );
    Ok(response.json().await?)
}

pub async fn list_movies(client: &reqwest::Client, base_url: &Url) -> Result<Rendered<MovieListView>> {
    let response = client.get(base_url.join("movies")?).send().await?;
    anyhow::ensure!(response.status().is_success(), "List failed");
    Ok(response.json().await?)
}

pub async fn form_errors(response: Response) -> Result<Rendered<MovieFormView>> {
    anyhow::ensure!(
        response.status().as_u16() == 422,
        "Expected invalid form, got {}",
        response.status()
    );
    Ok(response.json().await?)
}

pub async fn list_genres(client: &reqwest::Client, base_url: &Url) -> Result<Vec<Genre>> {
    let response = client.get(base_url.join("api/genre")?).send().await?;
    anyhow::ensure!(response.status().is_success(), "Genres failed");
    Ok(response.json().await?)
}
