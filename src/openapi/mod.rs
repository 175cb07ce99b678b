use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Order Desk API",
        version = "0.1.0",
        description = r#"
# Order Desk

Back office for a ColorMe shop: browse orders, group them into sheets,
print shipping labels, send status mails and translate subtitle files.

## Authentication

Shop endpoints act on behalf of the signed-in shop. Sign in through
`/auth/login`; the access token is kept in the `token` cookie. API clients may
send `Authorization: Bearer <token>` instead.

## Errors

Failures use one shape:

```json
{
  "error": "Bad Request",
  "message": "Bad request: no orders selected",
  "request_id": "5f0c...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    tags(
        (name = "auth", description = "Shop OAuth sign-in"),
        (name = "orders", description = "Shop orders"),
        (name = "sheets", description = "Locally stored order sheets"),
        (name = "labels", description = "Shipping label CSVs"),
        (name = "exports", description = "Generic CSV export"),
        (name = "subtitles", description = "Subtitle translation and dictionary"),
        (name = "listings", description = "Marketplace listings")
    ),
    paths(
        // Auth
        crate::handlers::auth::login,
        crate::handlers::auth::callback,
        crate::handlers::auth::logout,

        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::send_mails,
        crate::handlers::orders::update_slip_number,

        // Sheets
        crate::handlers::sheets::list_sheets,
        crate::handlers::sheets::create_sheet,
        crate::handlers::sheets::get_sheet,
        crate::handlers::sheets::delete_sheet,
        crate::handlers::sheets::add_items,
        crate::handlers::sheets::remove_item,
        crate::handlers::sheets::sheet_summary,
        crate::handlers::sheets::send_sheet_mails,
        crate::handlers::sheets::label_plan,
        crate::handlers::sheets::label_batch,

        // Exports
        crate::handlers::exports::selection_label_plan,
        crate::handlers::exports::selection_label_batch,
        crate::handlers::exports::export_csv,

        // Subtitles
        crate::handlers::subtitles::list_languages,
        crate::handlers::subtitles::translate_subtitles,
        crate::handlers::subtitles::estimate_cost,
        crate::handlers::subtitles::list_sub_words,
        crate::handlers::subtitles::create_sub_word,
        crate::handlers::subtitles::delete_sub_word,

        // Listings
        crate::handlers::listings::list_listings,
        crate::handlers::listings::create_listing,
        crate::handlers::listings::delete_listing,
        crate::handlers::listings::export_listings,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::models::MailState,
            crate::models::MailKind,
            crate::services::orders::Selection,
            crate::services::orders::OrderFilter,
            crate::services::sheets::ProductCategory,
            crate::services::listings::ListingExport,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
