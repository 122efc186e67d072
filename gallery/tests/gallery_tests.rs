mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use gallery::{
    gallery::{
        entry_route, DeleteOutcome, ListingState, RefreshOutcome, Route, SelectedFile,
        UploadOutcome, UploadState, IMAGES_ONLY, SELECT_A_FILE, SIGN_IN_REQUIRED,
        UPLOAD_SUCCEEDED,
    },
    identity::{JwtVerifier, Principal, SessionIdentity},
    namespace::{Namespace, ObjectKey},
    test_utils::StaticIdentity,
};
use pretty_assertions::assert_eq;

fn photo(name: &str) -> SelectedFile {
    SelectedFile::new(name, "image/jpeg", jpeg_bytes())
}

fn p1() -> Namespace {
    Namespace::for_principal(&Principal::new("p1").unwrap())
}

// Signed-out behaviour

#[tokio::test]
async fn test_signed_out_refresh_never_reaches_the_store() {
    let setup = ViewModelSetup::signed_out();

    let outcome = setup.view_model.refresh().await;

    assert_eq!(outcome, RefreshOutcome::SignedOut);
    assert_eq!(setup.store.calls().total(), 0);
    let state = setup.view_model.state().await;
    assert_eq!(state.listing, ListingState::Idle);
    assert!(state.items.is_empty());
}

#[tokio::test]
async fn test_signed_out_upload_never_reaches_the_store() {
    let setup = ViewModelSetup::signed_out();
    assert!(setup.view_model.select_file(photo("photo.jpg")).await);

    let outcome = setup.view_model.upload().await;

    assert_eq!(outcome, UploadOutcome::SignedOut);
    assert_eq!(setup.store.calls().total(), 0);
    let state = setup.view_model.state().await;
    assert_eq!(state.message.as_deref(), Some(SIGN_IN_REQUIRED));
    assert_eq!(state.upload, UploadState::Idle);
}

#[tokio::test]
async fn test_signed_out_delete_never_reaches_the_store() {
    let setup = ViewModelSetup::signed_out();
    let key = ObjectKey::generate("photo.jpg");
    setup.view_model.request_delete(key.as_str()).await.unwrap();

    let outcome = setup.view_model.resolve_delete(true).await;

    assert_eq!(outcome, DeleteOutcome::SignedOut);
    assert_eq!(setup.store.calls().total(), 0);
}

// Upload

#[tokio::test]
async fn test_upload_scenario_stores_under_generated_key() {
    let setup = ViewModelSetup::signed_in("p1");
    assert!(setup.view_model.select_file(photo("photo.jpg")).await);

    let outcome = setup.view_model.upload().await;

    let UploadOutcome::Uploaded(key) = outcome else {
        panic!("upload failed: {outcome:?}");
    };
    assert_generated_key(key.as_str(), "jpg");
    assert!(
        setup
            .store
            .inner()
            .contains(&format!("p1/{key}"))
            .await
    );

    let state = setup.view_model.state().await;
    assert_eq!(state.message.as_deref(), Some(UPLOAD_SUCCEEDED));
    assert_eq!(state.selected_file, None);
    assert_eq!(state.upload, UploadState::Idle);
    assert_eq!(state.listing, ListingState::Ready);
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0].name, key.as_str());
    assert_eq!(setup.store.calls().list, 1, "upload refreshes the listing");
}

#[tokio::test]
async fn test_upload_keeps_picker_content_type_without_extension() {
    let setup = ViewModelSetup::signed_in("p1");
    assert!(
        setup
            .view_model
            .select_file(SelectedFile::new("photo", "image/png", png_bytes()))
            .await
    );

    let UploadOutcome::Uploaded(key) = setup.view_model.upload().await else {
        panic!("upload failed");
    };

    assert_generated_key(key.as_str(), "");
    let url = setup.view_model.items().await[0].url.clone();
    let (content_type, _) = setup
        .store
        .inner()
        .resolve_signed_url(&url)
        .await
        .expect("signed URL should resolve");
    assert_eq!(content_type, "image/png");
}

#[tokio::test]
async fn test_upload_of_empty_file_asks_for_one() {
    let setup = ViewModelSetup::signed_in("p1");
    assert!(
        setup
            .view_model
            .select_file(SelectedFile::new("photo.png", "image/png", Vec::<u8>::new()))
            .await
    );

    let outcome = setup.view_model.upload().await;

    assert_eq!(outcome, UploadOutcome::NoFile);
    assert_eq!(setup.store.calls().total(), 0);
    assert_eq!(
        setup.view_model.state().await.message.as_deref(),
        Some(SELECT_A_FILE)
    );
}

#[tokio::test]
async fn test_upload_without_file_asks_for_one() {
    let setup = ViewModelSetup::signed_in("p1");

    let outcome = setup.view_model.upload().await;

    assert_eq!(outcome, UploadOutcome::NoFile);
    assert_eq!(setup.store.calls().total(), 0);
    assert_eq!(
        setup.view_model.state().await.message.as_deref(),
        Some(SELECT_A_FILE)
    );
}

#[tokio::test]
async fn test_upload_failure_keeps_file_and_skips_refresh() {
    let setup = ViewModelSetup::signed_in("p1");
    let file = photo("photo.jpg");
    assert!(setup.view_model.select_file(file.clone()).await);
    setup.store.fail_upload(true);

    let outcome = setup.view_model.upload().await;

    assert_eq!(outcome, UploadOutcome::Failed);
    let state = setup.view_model.state().await;
    assert_eq!(state.selected_file, Some(file));
    assert_eq!(state.upload, UploadState::Idle);
    assert!(state
        .message
        .as_deref()
        .is_some_and(|message| message.starts_with("Upload failed: ")));
    assert_eq!(setup.store.calls().list, 0);

    // Retry with the same selection once the store recovers
    setup.store.fail_upload(false);
    assert!(matches!(
        setup.view_model.upload().await,
        UploadOutcome::Uploaded(_)
    ));
}

#[tokio::test]
async fn test_non_image_selection_is_rejected() {
    let setup = ViewModelSetup::signed_in("p1");

    let accepted = setup
        .view_model
        .select_file(SelectedFile::new("notes.txt", "text/plain", "hello"))
        .await;

    assert!(!accepted);
    let state = setup.view_model.state().await;
    assert_eq!(state.selected_file, None);
    assert_eq!(state.message.as_deref(), Some(IMAGES_ONLY));
}

#[tokio::test]
async fn test_clear_file_drops_selection() {
    let setup = ViewModelSetup::signed_in("p1");
    assert!(setup.view_model.select_file(photo("photo.jpg")).await);

    setup.view_model.clear_file().await;

    assert_eq!(setup.view_model.state().await.selected_file, None);
    assert_eq!(setup.view_model.upload().await, UploadOutcome::NoFile);
}

#[tokio::test]
async fn test_concurrent_upload_is_rejected_while_busy() {
    let setup = ViewModelSetup::signed_in("p1");
    assert!(setup.view_model.select_file(photo("photo.jpg")).await);
    setup.store.delay_all(Duration::from_millis(200)).await;

    let first = tokio::spawn({
        let view_model = setup.view_model.clone();
        async move { view_model.upload().await }
    });
    let store = setup.store.clone();
    wait_until(move || store.calls().upload == 1).await;

    assert_eq!(setup.view_model.upload().await, UploadOutcome::Busy);
    assert!(matches!(
        first.await.unwrap(),
        UploadOutcome::Uploaded(_)
    ));
    assert_eq!(setup.store.calls().upload, 1);
}

// Refresh

#[tokio::test]
async fn test_refresh_lists_newest_first() {
    let setup = ViewModelSetup::signed_in("p1");
    let ns = p1();

    let oldest = setup.gateway.upload(&ns, "a.jpg", jpeg_bytes(), None).await.unwrap();
    let newest = setup.gateway.upload(&ns, "b.jpg", jpeg_bytes(), None).await.unwrap();

    let outcome = setup.view_model.refresh().await;

    assert_eq!(outcome, RefreshOutcome::Refreshed { items: 2 });
    let names: Vec<String> = setup
        .view_model
        .items()
        .await
        .into_iter()
        .map(|item| item.name)
        .collect();
    assert_eq!(names, vec![newest.to_string(), oldest.to_string()]);
}

#[tokio::test]
async fn test_refresh_failure_keeps_previous_items() {
    let setup = ViewModelSetup::signed_in("p1");
    setup
        .gateway
        .upload(&p1(), "a.jpg", jpeg_bytes(), None)
        .await
        .unwrap();
    assert_eq!(
        setup.view_model.refresh().await,
        RefreshOutcome::Refreshed { items: 1 }
    );
    let before = setup.view_model.items().await;

    setup.store.fail_list(true);
    let outcome = setup.view_model.refresh().await;

    assert_eq!(outcome, RefreshOutcome::Failed);
    let state = setup.view_model.state().await;
    assert_eq!(state.items, before);
    assert_eq!(state.listing, ListingState::Ready);
}

#[tokio::test]
async fn test_refresh_drops_items_that_fail_to_sign() {
    let setup = ViewModelSetup::signed_in("p1");
    let ns = p1();
    let kept = setup.gateway.upload(&ns, "a.jpg", jpeg_bytes(), None).await.unwrap();
    let broken = setup.gateway.upload(&ns, "b.jpg", jpeg_bytes(), None).await.unwrap();
    setup.store.fail_sign_for(broken.as_str()).await;

    let outcome = setup.view_model.refresh().await;

    assert_eq!(outcome, RefreshOutcome::Refreshed { items: 1 });
    assert_eq!(setup.view_model.items().await[0].name, kept.as_str());
}

#[tokio::test]
async fn test_overlapping_refresh_is_coalesced_and_rerun() {
    let setup = ViewModelSetup::signed_in("p1");
    setup.store.close_list_gate().await;

    let first = tokio::spawn({
        let view_model = setup.view_model.clone();
        async move { view_model.refresh().await }
    });
    let store = setup.store.clone();
    wait_until(move || store.calls().list == 1).await;

    // Lands while the first refresh is blocked in the store
    let key = setup
        .gateway
        .upload(&p1(), "late.jpg", jpeg_bytes(), None)
        .await
        .unwrap();
    assert_eq!(setup.view_model.refresh().await, RefreshOutcome::Coalesced);
    assert_eq!(setup.store.calls().list, 1, "no overlapping store listing");

    setup.store.open_list_gate(2).await;
    let outcome = first.await.unwrap();

    assert_eq!(outcome, RefreshOutcome::Refreshed { items: 1 });
    assert_eq!(setup.store.calls().list, 2, "coalesced request reruns once");
    assert_eq!(setup.view_model.items().await[0].name, key.as_str());
}

// Delete

#[tokio::test]
async fn test_declined_delete_removes_nothing() {
    let setup = ViewModelSetup::signed_in("p1");
    let key = setup
        .gateway
        .upload(&p1(), "a.jpg", jpeg_bytes(), None)
        .await
        .unwrap();
    setup.view_model.refresh().await;

    setup.view_model.request_delete(key.as_str()).await.unwrap();
    assert_eq!(
        setup.view_model.state().await.pending_delete,
        Some(key.clone())
    );

    let outcome = setup.view_model.resolve_delete(false).await;

    assert_eq!(outcome, DeleteOutcome::Cancelled);
    assert_eq!(setup.store.calls().remove, 0);
    assert!(setup.store.inner().contains(&p1().full_path(&key)).await);
    assert_eq!(setup.view_model.state().await.pending_delete, None);
}

#[tokio::test]
async fn test_confirmed_delete_removes_and_refreshes() {
    let setup = ViewModelSetup::signed_in("p1");
    let key = setup
        .gateway
        .upload(&p1(), "a.jpg", jpeg_bytes(), None)
        .await
        .unwrap();
    setup.view_model.refresh().await;
    assert_eq!(setup.view_model.items().await.len(), 1);

    setup.view_model.request_delete(key.as_str()).await.unwrap();
    let outcome = setup.view_model.resolve_delete(true).await;

    assert_eq!(outcome, DeleteOutcome::Deleted(key.clone()));
    assert_eq!(setup.store.calls().remove, 1);
    assert!(!setup.store.inner().contains(&p1().full_path(&key)).await);
    assert!(setup.view_model.items().await.is_empty());
}

#[tokio::test]
async fn test_failed_delete_raises_alert_and_keeps_listing() {
    let setup = ViewModelSetup::signed_in("p1");
    let key = setup
        .gateway
        .upload(&p1(), "a.jpg", jpeg_bytes(), None)
        .await
        .unwrap();
    setup.view_model.refresh().await;
    let lists_before = setup.store.calls().list;
    setup.store.fail_remove(true);

    setup.view_model.request_delete(key.as_str()).await.unwrap();
    let outcome = setup.view_model.confirm_delete().await;

    assert_eq!(outcome, DeleteOutcome::Failed);
    let state = setup.view_model.state().await;
    assert!(state
        .alert
        .as_deref()
        .is_some_and(|alert| alert.starts_with("Delete failed: ")));
    assert_eq!(state.items.len(), 1);
    assert_eq!(setup.store.calls().list, lists_before);

    setup.view_model.dismiss_alert().await;
    assert_eq!(setup.view_model.state().await.alert, None);
}

#[tokio::test]
async fn test_delete_requires_a_pending_request() {
    let setup = ViewModelSetup::signed_in("p1");

    assert_eq!(
        setup.view_model.confirm_delete().await,
        DeleteOutcome::NothingPending
    );
    assert_eq!(
        setup.view_model.cancel_delete().await,
        DeleteOutcome::NothingPending
    );
    assert_eq!(setup.store.calls().total(), 0);
}

#[tokio::test]
async fn test_delete_rejects_path_like_names() {
    let setup = ViewModelSetup::signed_in("p1");

    for name in ["../p2/a.jpg", "p2/a.jpg", ""] {
        assert!(setup.view_model.request_delete(name).await.is_err());
    }
    assert_eq!(setup.view_model.state().await.pending_delete, None);
}

// Identity

#[tokio::test]
async fn test_view_model_follows_identity_changes() {
    let setup = ViewModelSetup::signed_in("p1");
    setup
        .gateway
        .upload(&p1(), "a.jpg", jpeg_bytes(), None)
        .await
        .unwrap();

    assert_eq!(
        setup.view_model.principal().await,
        Some(Principal::new("p1").unwrap())
    );

    setup
        .identity
        .set(Some(Principal::new("p2").unwrap()))
        .await;
    assert_eq!(
        setup.view_model.refresh().await,
        RefreshOutcome::Refreshed { items: 0 }
    );

    setup.identity.set(None).await;
    assert_eq!(setup.view_model.refresh().await, RefreshOutcome::SignedOut);
}

// Routing

#[tokio::test]
async fn test_entry_route_resolves_identity_once() {
    let signed_in = StaticIdentity::signed_in("p1");
    assert_eq!(entry_route(&signed_in).await, Route::Dashboard);
    assert_eq!(signed_in.lookups(), 1);

    let signed_out = StaticIdentity::signed_out();
    assert_eq!(entry_route(&signed_out).await, Route::SignIn);
    assert_eq!(signed_out.lookups(), 1);

    assert_eq!(Route::Dashboard.path(), "/dashboard");
    assert_eq!(Route::SignIn.path(), "/login");
}

#[tokio::test]
async fn test_entry_route_with_session_identity() {
    let verifier = Arc::new(JwtVerifier::new(TEST_JWT_SECRET, None));
    let session = SessionIdentity::new(verifier.clone());
    assert_eq!(entry_route(&session).await, Route::SignIn);

    let token = verifier
        .issue(&Principal::new("p1").unwrap(), Duration::from_secs(60))
        .unwrap();
    session.sign_in(token).await;
    assert_eq!(entry_route(&session).await, Route::Dashboard);

    session.sign_in("not-a-token").await;
    assert_eq!(entry_route(&session).await, Route::SignIn);

    session.sign_out().await;
    assert_eq!(entry_route(&session).await, Route::SignIn);
}
