use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::AppState;
use crate::handlers::{auth, categories, comments, genres, reviews, titles, users};

/// Create all v1 API routes.
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        // Signup and token exchange
        .route("/auth/signup", post(auth::signup))
        .route("/auth/token", post(auth::obtain_token))
        // Categories and genres: list/create/delete only
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route("/categories/{slug}", delete(categories::delete_category))
        .route(
            "/genres",
            get(genres::list_genres).post(genres::create_genre),
        )
        .route("/genres/{slug}", delete(genres::delete_genre))
        // Titles
        .route(
            "/titles",
            get(titles::list_titles).post(titles::create_title),
        )
        .route(
            "/titles/{title_id}",
            get(titles::get_title)
                .patch(titles::update_title)
                .put(titles::update_title)
                .delete(titles::delete_title),
        )
        // Reviews, nested under their title
        .route(
            "/titles/{title_id}/reviews",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            get(reviews::get_review)
                .patch(reviews::update_review)
                .put(reviews::update_review)
                .delete(reviews::delete_review),
        )
        // Comments, nested under their review
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            get(comments::get_comment)
                .patch(comments::update_comment)
                .put(comments::update_comment)
                .delete(comments::delete_comment),
        )
        // User management (admin) and self-service profile
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/me", get(users::me).patch(users::update_me))
        .route(
            "/users/{username}",
            get(users::get_user)
                .patch(users::update_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
}
