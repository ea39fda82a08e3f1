use movies_app::{
    toast::ToastKind,
    view::{MovieFormView, Rendered},
};
use movies_dal::movie::Movie;
use movies_e2e_tests::{
    launch_env, prepare_env,
    rest::{MovieInput, create_movie, form_errors, jpeg_bytes, list_movies, submit},
};
use reqwest::multipart;
use tracing::info;
use tracing_test::traced_test;

async fn movie_details(client: &reqwest::Client, base_url: &reqwest::Url, id: i64) -> Movie {
    let response = client
        .get(base_url.join(&format!("movies/details/{id}")).unwrap())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let details: Rendered<Movie> = response.json().await.unwrap();
    details.model
}

#[tokio::test]
#[traced_test]
async fn test_prepare_create() {
    let (args, mut config_guard) = prepare_env("test_prepare_create").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _state) = launch_env(args, &mut config_guard).await.unwrap();

    let response = client
        .get(base_url.join("movies/create").unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let form: Rendered<MovieFormView> = response.json().await.unwrap();
    assert_eq!(form.view, "MovieForm");
    assert!(form.model.errors.is_empty());
    assert!(form.model.poster.is_none());
    assert_eq!(form.model.fields.id, None);
    assert_eq!(form.model.genres.len(), 10);
    let names: Vec<_> = form.model.genres.iter().map(|g| g.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert_eq!(names[0], "Action");
}

#[tokio::test]
#[traced_test]
async fn test_list_sorted_by_rate() {
    let (args, mut config_guard) = prepare_env("test_list_sorted").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _state) = launch_env(args, &mut config_guard).await.unwrap();

    let empty = list_movies(&client, &base_url).await.unwrap();
    assert_eq!(empty.view, "MovieList");
    assert!(empty.model.movies.is_empty());
    assert!(empty.model.toasts.is_empty());

    for (name, rate) in [("Middle", 7.5), ("Best", 9.1), ("Worst", 2.0)] {
        create_movie(&client, &base_url, &MovieInput::new(name, rate), jpeg_bytes(1024))
            .await
            .unwrap();
    }

    let listed = list_movies(&client, &base_url).await.unwrap();
    let names: Vec<_> = listed.model.movies.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["Best", "Middle", "Worst"]);
    // toast was consumed by the redirected list
    assert!(listed.model.toasts.is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_create_round_trip() {
    let (args, mut config_guard) = prepare_env("test_create_round_trip").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _state) = launch_env(args, &mut config_guard).await.unwrap();

    let poster = jpeg_bytes(500 * 1024);
    let input = MovieInput {
        name: "Inception",
        year: 2010,
        rate: 8.8,
        story_line: "A thief who steals corporate secrets through dream-sharing.",
        genre_id: 9,
    };
    let response = submit(
        &client,
        &base_url,
        "movies/create",
        input.form_with_poster("inception.JPG", poster.clone()),
    )
    .await
    .unwrap();
    info!("Response: {:?}", response);
    assert!(response.status().is_success());
    assert_eq!(response.url().path(), "/movies");

    let listed: Rendered<movies_app::view::MovieListView> = response.json().await.unwrap();
    assert_eq!(listed.model.toasts.len(), 1);
    assert_eq!(listed.model.toasts[0].kind, ToastKind::Success);
    assert_eq!(listed.model.toasts[0].message, "Movie created successfully");
    assert_eq!(listed.model.movies.len(), 1);
    let id = listed.model.movies[0].id;

    let response = client
        .get(base_url.join(&format!("movies/details/{id}")).unwrap())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let details: Rendered<Movie> = response.json().await.unwrap();
    assert_eq!(details.view, "MovieDetails");
    let movie = details.model;
    assert_eq!(movie.name, "Inception");
    assert_eq!(movie.year, 2010);
    assert_eq!(movie.rate, 8.8);
    assert_eq!(movie.genre_id, 9);
    assert_eq!(movie.genre.unwrap().name, "Sci-Fi");
    assert_eq!(movie.poster, poster);

    // query form of id
    let response = client
        .get(base_url.join(&format!("movies/details?id={id}")).unwrap())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = client
        .get(base_url.join(&format!("movies/poster/{id}")).unwrap())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/jpeg"
    );
    let bytes = response.bytes().await.unwrap();
    assert_eq!(bytes.as_ref(), poster.as_slice());

    // second list has no toast anymore
    let listed = list_movies(&client, &base_url).await.unwrap();
    assert!(listed.model.toasts.is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_create_invalid_fields() {
    let (args, mut config_guard) = prepare_env("test_create_invalid").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _state) = launch_env(args, &mut config_guard).await.unwrap();

    let form = multipart::Form::new()
        .text("year", "2001")
        .part(
            "poster",
            multipart::Part::bytes(jpeg_bytes(100)).file_name("p.jpg"),
        );
    let response = submit(&client, &base_url, "movies/create", form)
        .await
        .unwrap();
    let rendered = form_errors(response).await.unwrap();
    assert_eq!(rendered.view, "MovieForm");
    let errors = &rendered.model.errors;
    assert!(errors.contains("name"));
    assert!(errors.contains("rate"));
    assert!(errors.contains("story_line"));
    assert!(errors.contains("genre_id"));
    assert_eq!(rendered.model.genres.len(), 10);
    assert!(rendered.model.poster.is_none());

    let mut input = MovieInput::new("Too good", 11.0);
    input.genre_id = 999;
    let response = submit(
        &client,
        &base_url,
        "movies/create",
        input.form_with_poster("p.jpg", jpeg_bytes(100)),
    )
    .await
    .unwrap();
    let rendered = form_errors(response).await.unwrap();
    assert!(rendered.model.errors.contains("rate"));
    assert_eq!(
        rendered.model.errors.get("genre_id").unwrap(),
        ["Selected genre does not exist"]
    );
    // submitted values are redisplayed
    assert_eq!(rendered.model.fields.name, "Too good");

    let listed = list_movies(&client, &base_url).await.unwrap();
    assert!(listed.model.movies.is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_create_poster_rules() {
    let (args, mut config_guard) = prepare_env("test_create_poster").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _state) = launch_env(args, &mut config_guard).await.unwrap();
    let input = MovieInput::new("Poster test", 5.0);

    let poster_error = async |form: multipart::Form| -> String {
        let response = submit(&client, &base_url, "movies/create", form)
            .await
            .unwrap();
        let rendered = form_errors(response).await.unwrap();
        let messages = rendered.model.errors.get("poster").unwrap();
        assert_eq!(messages.len(), 1);
        messages[0].clone()
    };

    assert_eq!(
        poster_error(input.form()).await,
        "Please Select movie Poster"
    );
    assert_eq!(
        poster_error(input.form_with_poster("poster.gif", jpeg_bytes(100))).await,
        "Only .png, jpg images are allowed"
    );
    assert_eq!(
        poster_error(input.form_with_poster("poster.jpg", jpeg_bytes(1_048_577))).await,
        "poster cannot be > 1MB"
    );

    // poster bigger than the whole request body limit
    assert_eq!(
        poster_error(input.form_with_poster("poster.jpg", jpeg_bytes(12 * 1024 * 1024))).await,
        "poster cannot be > 1MB"
    );
    let listed = list_movies(&client, &base_url).await.unwrap();
    assert!(listed.model.movies.is_empty());

    // exactly at the limit is fine
    let listed = create_movie(&client, &base_url, &input, jpeg_bytes(1_048_576))
        .await
        .unwrap();
    assert_eq!(listed.model.movies.len(), 1);
}

#[tokio::test]
#[traced_test]
async fn test_edit_and_update() {
    let (args, mut config_guard) = prepare_env("test_edit_update").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _state) = launch_env(args, &mut config_guard).await.unwrap();

    let original_poster = jpeg_bytes(2048);
    let listed = create_movie(
        &client,
        &base_url,
        &MovieInput::new("Original", 6.0),
        original_poster.clone(),
    )
    .await
    .unwrap();
    let id = listed.model.movies[0].id;

    let response = client
        .get(base_url.join(&format!("movies/edit/{id}")).unwrap())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let form: Rendered<MovieFormView> = response.json().await.unwrap();
    assert_eq!(form.model.fields.id, Some(id));
    assert_eq!(form.model.fields.name, "Original");
    assert_eq!(form.model.poster.as_deref(), Some(original_poster.as_slice()));
    assert!(form.model.errors.is_empty());

    // update without file keeps poster
    let edit_path = format!("movies/edit/{id}");
    let response = submit(
        &client,
        &base_url,
        &edit_path,
        MovieInput::new("Renamed", 7.0).form(),
    )
    .await
    .unwrap();
    assert!(response.status().is_success());
    let listed: Rendered<movies_app::view::MovieListView> = response.json().await.unwrap();
    assert_eq!(listed.model.toasts[0].message, "Movie Updated successfully");
    let movie = &listed.model.movies[0];
    assert_eq!(movie.name, "Renamed");
    assert_eq!(movie.rate, 7.0);
    assert_eq!(movie.poster, original_poster);

    // rejected poster leaves stored one in place and redisplays it
    let response = submit(
        &client,
        &base_url,
        &edit_path,
        MovieInput::new("Renamed again", 7.0).form_with_poster("poster.bmp", jpeg_bytes(10)),
    )
    .await
    .unwrap();
    let rendered = form_errors(response).await.unwrap();
    assert_eq!(
        rendered.model.errors.get("poster").unwrap(),
        ["Only .png, jpg images are allowed"]
    );
    assert_eq!(
        rendered.model.poster.as_deref(),
        Some(original_poster.as_slice())
    );

    let response = submit(
        &client,
        &base_url,
        &edit_path,
        MovieInput::new("Renamed again", 7.0).form_with_poster("poster.jpg", jpeg_bytes(1_100_000)),
    )
    .await
    .unwrap();
    let rendered = form_errors(response).await.unwrap();
    assert_eq!(
        rendered.model.errors.get("poster").unwrap(),
        ["poster cannot be > 1MB"]
    );

    // poster bigger than the whole request body limit
    let response = submit(
        &client,
        &base_url,
        &edit_path,
        MovieInput::new("Renamed again", 7.0)
            .form_with_poster("poster.jpg", jpeg_bytes(12 * 1024 * 1024)),
    )
    .await
    .unwrap();
    let rendered = form_errors(response).await.unwrap();
    assert_eq!(
        rendered.model.errors.get("poster").unwrap(),
        ["poster cannot be > 1MB"]
    );

    // invalid fields re-render the form, with all genres
    let form = multipart::Form::new()
        .text("name", "  ")
        .text("year", "2001")
        .text("rate", "0")
        .text("story_line", "Changed story")
        .text("genre_id", "3");
    let response = submit(&client, &base_url, &edit_path, form).await.unwrap();
    let rendered = form_errors(response).await.unwrap();
    assert_eq!(rendered.view, "MovieForm");
    assert!(rendered.model.errors.contains("name"));
    assert!(rendered.model.errors.contains("rate"));
    assert!(!rendered.model.errors.contains("story_line"));
    assert_eq!(rendered.model.genres.len(), 10);
    assert_eq!(rendered.model.fields.id, Some(id));

    // none of the rejected updates changed the stored movie
    let stored = movie_details(&client, &base_url, id).await;
    assert_eq!(stored.name, "Renamed");
    assert_eq!(stored.rate, 7.0);
    assert_eq!(stored.story_line, "Some story");
    assert_eq!(stored.poster, original_poster);

    // id may come from the form itself
    let new_poster = jpeg_bytes(4096);
    let form = MovieInput::new("Replaced", 8.0)
        .form_with_poster("new.png", new_poster.clone())
        .text("id", id.to_string());
    let response = submit(&client, &base_url, "movies/edit", form)
        .await
        .unwrap();
    assert!(response.status().is_success());
    let listed: Rendered<movies_app::view::MovieListView> = response.json().await.unwrap();
    let movie = &listed.model.movies[0];
    assert_eq!(movie.name, "Replaced");
    assert_eq!(movie.poster, new_poster);
}

#[tokio::test]
#[traced_test]
async fn test_missing_and_unknown_ids() {
    let (args, mut config_guard) = prepare_env("test_missing_ids").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _state) = launch_env(args, &mut config_guard).await.unwrap();

    let status = async |path: &str| {
        client
            .get(base_url.join(path).unwrap())
            .send()
            .await
            .unwrap()
            .status()
            .as_u16()
    };

    assert_eq!(status("movies/edit").await, 400);
    assert_eq!(status("movies/details").await, 400);
    assert_eq!(status("movies/delete").await, 400);
    assert_eq!(status("movies/edit?id=abc").await, 400);
    assert_eq!(status("movies/edit/99999").await, 404);
    assert_eq!(status("movies/details/99999").await, 404);
    assert_eq!(status("movies/poster/99999").await, 404);

    let response = submit(
        &client,
        &base_url,
        "movies/edit/99999",
        MovieInput::new("Ghost", 5.0).form(),
    )
    .await
    .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = submit(
        &client,
        &base_url,
        "movies/edit",
        MovieInput::new("Ghost", 5.0).form(),
    )
    .await
    .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
#[traced_test]
async fn test_delete() {
    let (args, mut config_guard) = prepare_env("test_delete").await.unwrap();
    let base_url = args.base_url.clone();
    let (client, _state) = launch_env(args, &mut config_guard).await.unwrap();

    let mut ids = vec![];
    for name in ["First", "Second"] {
        let listed = create_movie(&client, &base_url, &MovieInput::new(name, 5.0), jpeg_bytes(64))
            .await
            .unwrap();
        ids = listed.model.movies.iter().map(|m| m.id).collect();
    }
    assert_eq!(ids.len(), 2);

    let delete_url = base_url.join(&format!("movies/delete/{}", ids[0])).unwrap();
    let response = client.post(delete_url.clone()).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client.post(delete_url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = client
        .delete(base_url.join(&format!("movies/{}", ids[1])).unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let listed = list_movies(&client, &base_url).await.unwrap();
    assert!(listed.model.movies.is_empty());
}
