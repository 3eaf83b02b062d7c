//! HTTP layer: page handlers, routing and middleware.
//!
//! Routes are grouped by audience:
//! - Public pages: news, presentation, donation, contact, register/login
//! - The member area and staff/admin actions behind the session cookie
//! - Embedded static assets and uploaded images

pub mod auth;
pub mod gallery;
pub mod middleware;
pub mod news;
pub mod pages;
pub mod static_files;

use axum::{
    extract::DefaultBodyLimit, middleware as axum_middleware, routing::get, Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

pub use middleware::{AppState, AuthenticatedUser, PageError};

/// Assemble the full application router, middleware included.
pub fn build_router(state: AppState) -> Router {
    let member_routes = Router::new()
        .merge(gallery::router())
        .merge(news::router())
        .merge(auth::protected_router())
        .merge(pages::admin_router())
        .route_layer(axum_middleware::from_fn(middleware::require_auth));

    let max_upload = state.config.uploads.max_file_size as usize;

    Router::new()
        .merge(pages::router())
        .merge(auth::public_router())
        .merge(member_routes)
        .route("/static/{*path}", get(static_files::serve_asset))
        .route("/uploads/{*path}", get(static_files::serve_upload))
        .fallback(pages::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::load_session_user,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::error_page_layer,
        ))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BootstrapConfig, Config, UploadConfig};
    use crate::db::repositories::{
        SqlxAlbumRepository, SqlxContactRepository, SqlxNewsRepository, SqlxPhotoRepository,
        SqlxSessionRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::services::{
        ContactService, DonationService, EmailService, GalleryService, MediaService, NewsService,
        UserService,
    };
    use crate::view::ViewEngine;
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::{TestResponse, TestServer};
    use std::sync::Arc;
    use tempfile::TempDir;

    const ADMIN_USERNAME: &str = "admin";
    const ADMIN_PASSWORD: &str = "motdepasseadmin";

    async fn setup() -> (TempDir, AppState) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = Config {
            uploads: UploadConfig {
                dir: dir.path().to_path_buf(),
                ..UploadConfig::default()
            },
            bootstrap: BootstrapConfig {
                admin_username: ADMIN_USERNAME.to_string(),
                admin_password: ADMIN_PASSWORD.to_string(),
            },
            ..Config::default()
        };

        let media = Arc::new(MediaService::new(
            config.uploads.clone(),
            config.media_host.clone(),
        ));
        let email = Arc::new(EmailService::new(config.email.clone()));
        let user_service = Arc::new(UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
        ));
        let gallery_service = Arc::new(GalleryService::new(
            SqlxAlbumRepository::boxed(pool.clone()),
            SqlxPhotoRepository::boxed(pool.clone()),
            media.clone(),
        ));
        let news_service = Arc::new(NewsService::new(
            SqlxNewsRepository::boxed(pool.clone()),
            media,
        ));
        let contact_service = Arc::new(ContactService::new(
            SqlxContactRepository::boxed(pool.clone()),
            email,
        ));
        let donation_service = Arc::new(DonationService::new(
            config.donations.clone(),
            config.site.name.clone(),
            config.server.base_url.clone(),
        ));

        user_service
            .bootstrap_admin(&config.bootstrap)
            .await
            .expect("Failed to bootstrap admin");

        let state = AppState {
            config: Arc::new(config),
            views: Arc::new(ViewEngine::new().expect("Failed to build view engine")),
            user_service,
            gallery_service,
            news_service,
            contact_service,
            donation_service,
        };

        (dir, state)
    }

    fn test_server(state: &AppState) -> TestServer {
        let mut server =
            TestServer::new(build_router(state.clone())).expect("Failed to start test server");
        server.save_cookies();
        server
    }

    fn location_of(response: &TestResponse) -> String {
        response
            .header("location")
            .to_str()
            .expect("Location header is not valid UTF-8")
            .to_string()
    }

    async fn register(server: &TestServer, username: &str, password: &str, role: &str) {
        let response = server
            .post("/register")
            .form(&[
                ("username", username),
                ("password", password),
                ("role", role),
            ])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location_of(&response), "/login");
    }

    async fn login(server: &TestServer, username: &str, password: &str) {
        let response = server
            .post("/login")
            .form(&[("username", username), ("password", password)])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location_of(&response), "/espace");
    }

    /// Register a KP account, validate its role request and log it in.
    async fn staff_member(state: &AppState, server: &TestServer, username: &str) {
        register(server, username, "motdepasse123", "KP").await;
        let pending = state
            .user_service
            .pending_requests()
            .await
            .expect("Failed to list pending requests");
        let user = pending
            .iter()
            .find(|u| u.username == username)
            .expect("Registered account has no pending request");
        state
            .user_service
            .validate_role(user.id)
            .await
            .expect("Failed to validate role");
        login(server, username, "motdepasse123").await;
    }

    // ========================================================================
    // Public pages
    // ========================================================================

    #[tokio::test]
    async fn test_public_pages_render() {
        let (_dir, state) = setup().await;
        let server = test_server(&state);

        for path in [
            "/",
            "/actus",
            "/nous-connaitre",
            "/nous-soutenir",
            "/contact",
            "/don/merci",
        ] {
            let response = server.get(path).await;
            response.assert_status_ok();
        }
    }

    #[tokio::test]
    async fn test_unknown_page_renders_404() {
        let (_dir, state) = setup().await;
        let server = test_server(&state);

        let response = server.get("/page-inconnue").await;
        response.assert_status_not_found();
        assert!(response.text().contains("Page introuvable"));
    }

    #[tokio::test]
    async fn test_checkout_without_configured_key() {
        let (_dir, state) = setup().await;
        let server = test_server(&state);

        let response = server
            .post("/don/checkout")
            .form(&[("amount_eur", "25")])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location_of(&response), "/nous-soutenir");

        let page = server.get("/nous-soutenir").await;
        assert!(page
            .text()
            .contains("Stripe n’est pas configuré (AMICALE_STRIPE_SECRET_KEY)."));
    }

    #[tokio::test]
    async fn test_contact_message_reaches_the_admin() {
        let (_dir, state) = setup().await;
        let server = test_server(&state);

        let response = server
            .post("/contact")
            .form(&[
                ("name", "Jean"),
                ("email", "jean@example.org"),
                ("subject", "Repas de rentrée"),
                ("message", "On peut venir à deux ?"),
            ])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location_of(&response), "/contact");
        let page = server.get("/contact").await;
        assert!(page
            .text()
            .contains("Message envoyé ✅ (il sera visible par l’admin)."));

        let response = server
            .post("/contact")
            .form(&[
                ("name", "Jean"),
                ("email", ""),
                ("subject", "Sans adresse"),
                ("message", "..."),
            ])
            .await;
        assert_eq!(location_of(&response), "/contact");
        let page = server.get("/contact").await;
        assert!(page.text().contains("Merci de remplir tous les champs."));

        let admin = test_server(&state);
        login(&admin, ADMIN_USERNAME, ADMIN_PASSWORD).await;
        let messages = admin.get("/admin/messages").await;
        messages.assert_status_ok();
        assert!(messages.text().contains("Repas de rentrée"));
    }

    // ========================================================================
    // Accounts and sessions
    // ========================================================================

    #[tokio::test]
    async fn test_member_area_requires_login() {
        let (_dir, state) = setup().await;
        let server = test_server(&state);

        let response = server.get("/espace").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location_of(&response), "/login");

        let login_page = server.get("/login").await;
        login_page.assert_status_ok();
        assert!(login_page.text().contains("Connexion requise."));
    }

    #[tokio::test]
    async fn test_register_login_logout() {
        let (_dir, state) = setup().await;
        let server = test_server(&state);

        register(&server, "alice", "motdepasse123", "JEUNE").await;
        let login_page = server.get("/login").await;
        assert!(login_page.text().contains("Compte créé."));

        login(&server, "alice", "motdepasse123").await;
        let espace = server.get("/espace").await;
        espace.assert_status_ok();
        assert!(espace.text().contains("Espace membres"));
        assert!(espace.text().contains("Connecté ✅"));

        let response = server.get("/logout").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location_of(&response), "/");

        let response = server.get("/espace").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location_of(&response), "/login");
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let (_dir, state) = setup().await;
        let server = test_server(&state);

        let response = server
            .post("/register")
            .form(&[
                ("username", "bob"),
                ("password", "court"),
                ("role", "JEUNE"),
            ])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location_of(&response), "/register");
        let page = server.get("/register").await;
        assert!(page
            .text()
            .contains("Mot de passe trop court (8 caractères minimum)."));

        register(&server, "bob", "motdepasse123", "JEUNE").await;
        let response = server
            .post("/register")
            .form(&[
                ("username", "bob"),
                ("password", "motdepasse123"),
                ("role", "JEUNE"),
            ])
            .await;
        assert_eq!(location_of(&response), "/register");
        let page = server.get("/register").await;
        assert!(page.text().contains("Ce login existe déjà."));
    }

    #[tokio::test]
    async fn test_change_password() {
        let (_dir, state) = setup().await;
        let server = test_server(&state);

        register(&server, "alice", "motdepasse123", "JEUNE").await;
        login(&server, "alice", "motdepasse123").await;

        let response = server
            .post("/changer-mot-de-passe")
            .form(&[("old_password", "faux"), ("new_password", "nouveaumotdepasse")])
            .await;
        assert_eq!(location_of(&response), "/changer-mot-de-passe");
        let page = server.get("/changer-mot-de-passe").await;
        assert!(page.text().contains("Ancien mot de passe incorrect."));

        let response = server
            .post("/changer-mot-de-passe")
            .form(&[
                ("old_password", "motdepasse123"),
                ("new_password", "nouveaumotdepasse"),
            ])
            .await;
        assert_eq!(location_of(&response), "/espace");
        let espace = server.get("/espace").await;
        assert!(espace.text().contains("Mot de passe mis à jour ✅"));

        let fresh = test_server(&state);
        login(&fresh, "alice", "nouveaumotdepasse").await;
    }

    // ========================================================================
    // Roles and the member area
    // ========================================================================

    #[tokio::test]
    async fn test_plain_member_cannot_publish() {
        let (_dir, state) = setup().await;
        let server = test_server(&state);

        register(&server, "alice", "motdepasse123", "JEUNE").await;
        login(&server, "alice", "motdepasse123").await;

        let response = server.get("/album/nouveau").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location_of(&response), "/espace");
        let espace = server.get("/espace").await;
        assert!(espace.text().contains("Accès réservé (KP/RESPONSABLE validé)."));

        let form = MultipartForm::new()
            .add_text("title", "Actu sauvage")
            .add_text("content", "Texte");
        let response = server.post("/staff/actus").multipart(form).await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location_of(&response), "/");
    }

    #[tokio::test]
    async fn test_role_request_validation_flow() {
        let (_dir, state) = setup().await;
        let bob = test_server(&state);
        let admin = test_server(&state);

        register(&bob, "bob", "motdepasse123", "KP").await;
        assert!(bob.get("/login").await.text().contains("un admin doit valider"));
        login(&bob, "bob", "motdepasse123").await;

        // The request is still pending, publishing stays closed.
        let response = bob
            .post("/album/nouveau")
            .form(&[
                ("title", "Camp 2024"),
                ("description", ""),
                ("consent", "yes"),
            ])
            .await;
        assert_eq!(location_of(&response), "/espace");

        login(&admin, ADMIN_USERNAME, ADMIN_PASSWORD).await;
        let roles_page = admin.get("/admin/roles").await;
        roles_page.assert_status_ok();
        assert!(roles_page.text().contains("bob"));

        let pending = state
            .user_service
            .pending_requests()
            .await
            .expect("Failed to list pending requests");
        let response = admin
            .post(&format!("/admin/roles/{}/validate", pending[0].id))
            .await;
        assert_eq!(location_of(&response), "/admin/roles");
        assert!(admin.get("/admin/roles").await.text().contains("Rôle validé ✅"));

        // Bob's open session picks up the validated role.
        let response = bob
            .post("/album/nouveau")
            .form(&[
                ("title", "Camp 2024"),
                ("description", "Souvenirs du camp"),
                ("consent", "yes"),
            ])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        let album_path = location_of(&response);
        assert!(album_path.starts_with("/album/"));

        let album_page = bob.get(&album_path).await;
        album_page.assert_status_ok();
        assert!(album_page.text().contains("Album créé ✅"));
        assert!(album_page.text().contains("Camp 2024"));
    }

    #[tokio::test]
    async fn test_admin_pages_refuse_plain_members() {
        let (_dir, state) = setup().await;
        let server = test_server(&state);

        register(&server, "alice", "motdepasse123", "JEUNE").await;
        login(&server, "alice", "motdepasse123").await;

        for path in ["/admin/roles", "/admin/messages"] {
            let response = server.get(path).await;
            response.assert_status(StatusCode::SEE_OTHER);
            assert_eq!(location_of(&response), "/espace");
            let espace = server.get("/espace").await;
            assert!(espace.text().contains("Accès réservé à l’admin."));
        }
    }

    // ========================================================================
    // Albums and photos
    // ========================================================================

    #[tokio::test]
    async fn test_album_creation_validation() {
        let (_dir, state) = setup().await;
        let staff = test_server(&state);
        staff_member(&state, &staff, "charlie").await;

        let response = staff
            .post("/album/nouveau")
            .form(&[("title", "Camp"), ("description", ""), ("consent", "")])
            .await;
        assert_eq!(location_of(&response), "/album/nouveau");
        let page = staff.get("/album/nouveau").await;
        assert!(page
            .text()
            .contains("Merci de confirmer le respect du droit à l’image."));

        let response = staff
            .post("/album/nouveau")
            .form(&[("title", "   "), ("description", ""), ("consent", "yes")])
            .await;
        assert_eq!(location_of(&response), "/album/nouveau");
        let page = staff.get("/album/nouveau").await;
        assert!(page.text().contains("Titre obligatoire."));
    }

    #[tokio::test]
    async fn test_missing_album_redirects_to_member_area() {
        let (_dir, state) = setup().await;
        let server = test_server(&state);

        register(&server, "alice", "motdepasse123", "JEUNE").await;
        login(&server, "alice", "motdepasse123").await;

        let response = server.get("/album/999").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location_of(&response), "/espace");
        let espace = server.get("/espace").await;
        assert!(espace.text().contains("Album introuvable."));
    }

    #[tokio::test]
    async fn test_photo_upload_and_moderation() {
        let (_dir, state) = setup().await;
        let staff = test_server(&state);
        let admin = test_server(&state);

        staff_member(&state, &staff, "charlie").await;
        let response = staff
            .post("/album/nouveau")
            .form(&[
                ("title", "Sortie vélo"),
                ("description", ""),
                ("consent", "yes"),
            ])
            .await;
        let album_path = location_of(&response);

        let form = MultipartForm::new()
            .add_text("caption", "Le départ")
            .add_text("consent", "yes")
            .add_part(
                "photo",
                Part::bytes(b"fake image bytes".to_vec())
                    .file_name("depart.png")
                    .mime_type("image/png"),
            );
        let response = staff.post(&album_path).multipart(form).await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location_of(&response), album_path);

        let page = staff.get(&album_path).await;
        assert!(page.text().contains("Photo ajoutée ✅"));
        assert!(page.text().contains("Le départ"));
        assert!(page.text().contains("En attente"));

        let album_id: i64 = album_path
            .rsplit('/')
            .next()
            .and_then(|part| part.parse().ok())
            .expect("Album path has no numeric id");
        let (_, photos) = state
            .gallery_service
            .album_with_photos(album_id)
            .await
            .expect("Failed to load album");
        let photo = &photos[0];

        // The stored file is served back from the uploads directory.
        let upload = staff.get(&photo.file_path).await;
        upload.assert_status_ok();

        login(&admin, ADMIN_USERNAME, ADMIN_PASSWORD).await;
        let response = admin.post(&format!("/photo/{}/approve", photo.id)).await;
        assert_eq!(location_of(&response), album_path);
        assert!(admin.get(&album_path).await.text().contains("Photo approuvée ✅"));

        let response = admin.post(&format!("/album/{}/approve", album_id)).await;
        assert_eq!(location_of(&response), "/espace");
        assert!(admin.get("/espace").await.text().contains("Album approuvé ✅"));

        let response = admin.post(&format!("/photo/{}/delete", photo.id)).await;
        assert_eq!(location_of(&response), album_path);
        let (_, photos) = state
            .gallery_service
            .album_with_photos(album_id)
            .await
            .expect("Failed to load album");
        assert!(photos.is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejections() {
        let (_dir, state) = setup().await;
        let staff = test_server(&state);

        staff_member(&state, &staff, "charlie").await;
        let response = staff
            .post("/album/nouveau")
            .form(&[("title", "Camp"), ("description", ""), ("consent", "yes")])
            .await;
        let album_path = location_of(&response);

        let form = MultipartForm::new()
            .add_text("caption", "")
            .add_text("consent", "yes");
        let response = staff.post(&album_path).multipart(form).await;
        assert_eq!(location_of(&response), album_path);
        let page = staff.get(&album_path).await;
        assert!(page.text().contains("Aucun fichier sélectionné."));

        let form = MultipartForm::new().add_text("consent", "yes").add_part(
            "photo",
            Part::bytes(b"GIF89a".to_vec())
                .file_name("anim.gif")
                .mime_type("image/gif"),
        );
        let response = staff.post(&album_path).multipart(form).await;
        assert_eq!(location_of(&response), album_path);
        let page = staff.get(&album_path).await;
        assert!(page.text().contains("Format non autorisé (png/jpg/jpeg/webp)."));

        let form = MultipartForm::new().add_text("caption", "Sans accord").add_part(
            "photo",
            Part::bytes(b"fake image bytes".to_vec())
                .file_name("photo.jpg")
                .mime_type("image/jpeg"),
        );
        let response = staff.post(&album_path).multipart(form).await;
        assert_eq!(location_of(&response), album_path);
        let page = staff.get(&album_path).await;
        assert!(page
            .text()
            .contains("Merci de confirmer le respect du droit à l’image."));
    }

    #[tokio::test]
    async fn test_unvalidated_member_cannot_upload() {
        let (_dir, state) = setup().await;
        let staff = test_server(&state);
        let member = test_server(&state);

        staff_member(&state, &staff, "charlie").await;
        let response = staff
            .post("/album/nouveau")
            .form(&[("title", "Camp"), ("description", ""), ("consent", "yes")])
            .await;
        let album_path = location_of(&response);

        register(&member, "alice", "motdepasse123", "JEUNE").await;
        login(&member, "alice", "motdepasse123").await;

        // Members see the album but cannot add to it.
        member.get(&album_path).await.assert_status_ok();

        let form = MultipartForm::new().add_text("consent", "yes").add_part(
            "photo",
            Part::bytes(b"fake image bytes".to_vec())
                .file_name("photo.png")
                .mime_type("image/png"),
        );
        let response = member.post(&album_path).multipart(form).await;
        assert_eq!(location_of(&response), album_path);
        let page = member.get(&album_path).await;
        assert!(page.text().contains("Upload réservé (KP/RESPONSABLE validé)."));
    }

    // ========================================================================
    // News
    // ========================================================================

    #[tokio::test]
    async fn test_news_publish_and_admin_delete() {
        let (_dir, state) = setup().await;
        let staff = test_server(&state);
        let admin = test_server(&state);

        staff_member(&state, &staff, "charlie").await;

        let form = MultipartForm::new()
            .add_text("title", "Reprise des activités")
            .add_text("content", "Rendez-vous samedi à 14h.");
        let response = staff.post("/staff/actus").multipart(form).await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(location_of(&response), "/actus");

        let actus = staff.get("/actus").await;
        assert!(actus.text().contains("Actu publiée ✅"));
        assert!(actus.text().contains("Reprise des activités"));

        // The home page shows the latest posts.
        let home = staff.get("/").await;
        assert!(home.text().contains("Reprise des activités"));

        let form = MultipartForm::new()
            .add_text("title", "")
            .add_text("content", "Sans titre");
        let response = staff.post("/staff/actus").multipart(form).await;
        assert_eq!(location_of(&response), "/staff/actus");
        let page = staff.get("/staff/actus").await;
        assert!(page.text().contains("Titre + contenu obligatoires."));

        let posts = state.news_service.list().await.expect("Failed to list posts");
        let post_id = posts[0].id;

        // Deleting is for the admin, not for staff.
        let response = staff.post(&format!("/admin/post/{}/delete", post_id)).await;
        assert_eq!(location_of(&response), "/actus");
        let actus = staff.get("/actus").await;
        assert!(actus.text().contains("Suppression réservée à l’admin."));

        login(&admin, ADMIN_USERNAME, ADMIN_PASSWORD).await;
        let response = admin.post(&format!("/admin/post/{}/delete", post_id)).await;
        assert_eq!(location_of(&response), "/actus");
        let actus = admin.get("/actus").await;
        assert!(actus.text().contains("Actu supprimée ✅"));
        assert!(!actus.text().contains("Reprise des activités"));
    }
}
