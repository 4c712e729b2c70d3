// src/api.rs
use crate::error::CustomError;
use crate::models::{TradeType, UserSession};
use crate::service::{PortfolioService, TradeOrder};
use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

#[derive(Deserialize)]
struct TransactionQuery {
    #[serde(rename = "type")]
    trade_type: Option<String>,
}

#[derive(Deserialize)]
struct InsightQuery {
    symbols: Option<String>,
}

/// Routes with rejections turned into JSON error replies.
pub fn app(
    service: Arc<PortfolioService>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    routes(service).recover(handle_rejection)
}

pub fn routes(
    service: Arc<PortfolioService>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let summary = warp::path!("portfolio")
        .and(warp::get())
        .and(with_user_session())
        .and(with_service(service.clone()))
        .and_then(summary_handler);

    let asset = warp::path!("portfolio" / String)
        .and(warp::get())
        .and(with_user_session())
        .and(with_service(service.clone()))
        .and_then(asset_handler);

    let market = warp::path!("market")
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(market_handler);

    let buy = warp::path!("trades" / "buy")
        .and(warp::post())
        .and(with_user_session())
        .and(with_service(service.clone()))
        .and(warp::body::json())
        .and_then(buy_handler);

    let sell = warp::path!("trades" / "sell")
        .and(warp::post())
        .and(with_user_session())
        .and(with_service(service.clone()))
        .and(warp::body::json())
        .and_then(sell_handler);

    let transactions = warp::path!("transactions")
        .and(warp::get())
        .and(with_user_session())
        .and(with_service(service.clone()))
        .and(warp::query::<TransactionQuery>())
        .and_then(transactions_handler);

    let insights = warp::path!("insights")
        .and(warp::get())
        .and(with_user_session())
        .and(with_service(service))
        .and(warp::query::<InsightQuery>())
        .and_then(insights_handler);

    summary
        .or(asset)
        .or(market)
        .or(buy)
        .or(sell)
        .or(transactions)
        .or(insights)
}

fn with_service(
    service: Arc<PortfolioService>,
) -> impl Filter<Extract = (Arc<PortfolioService>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

/// Builds the caller's session from `X-User-Email` and an optional bearer token.
fn with_user_session() -> impl Filter<Extract = (UserSession,), Error = Rejection> + Clone {
    warp::header::optional::<String>("x-user-email")
        .and(warp::header::optional::<String>("authorization"))
        .and_then(|email: Option<String>, authorization: Option<String>| async move {
            let email = email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .ok_or_else(|| {
                    warp::reject::custom(CustomError::new(
                        StatusCode::UNAUTHORIZED,
                        "No user session found. Please login.",
                    ))
                })?;
            let mut session = UserSession::new(&email);
            if let Some(token) = authorization.as_deref().and_then(bearer_token) {
                session = session.with_token(token);
            }
            Ok::<_, Rejection>(session)
        })
}

/// Token from an `Authorization` value; the scheme name is case-insensitive.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        debug!("Ignoring {} authorization scheme.", scheme);
        return None;
    }
    Some(token.trim()).filter(|token| !token.is_empty())
}

async fn summary_handler(
    session: UserSession,
    service: Arc<PortfolioService>,
) -> Result<impl Reply, Rejection> {
    match service.summary(&session).await {
        Ok(summary) => Ok(warp::reply::json(&summary)),
        Err(e) => {
            error!("Failed to load portfolio for {}: {}", session.email, e);
            Err(warp::reject::custom(CustomError::from(e)))
        }
    }
}

async fn asset_handler(
    symbol: String,
    session: UserSession,
    service: Arc<PortfolioService>,
) -> Result<impl Reply, Rejection> {
    match service.asset(&session, &symbol).await {
        Ok(detail) => Ok(warp::reply::json(&detail)),
        Err(e) => {
            warn!("Failed to load {} for {}: {}", symbol, session.email, e);
            Err(warp::reject::custom(CustomError::from(e)))
        }
    }
}

async fn market_handler(service: Arc<PortfolioService>) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&service.market().await))
}

async fn buy_handler(
    session: UserSession,
    service: Arc<PortfolioService>,
    order: TradeOrder,
) -> Result<impl Reply, Rejection> {
    match service.buy(&session, order).await {
        Ok(receipt) => {
            info!("Buy executed successfully.");
            Ok(warp::reply::with_status(
                warp::reply::json(&receipt),
                StatusCode::CREATED,
            ))
        }
        Err(e) => {
            error!("Buy failed: {}", e);
            Err(warp::reject::custom(CustomError::from(e)))
        }
    }
}

async fn sell_handler(
    session: UserSession,
    service: Arc<PortfolioService>,
    order: TradeOrder,
) -> Result<impl Reply, Rejection> {
    match service.sell(&session, order).await {
        Ok(receipt) => {
            info!("Sell executed successfully.");
            Ok(warp::reply::with_status(
                warp::reply::json(&receipt),
                StatusCode::CREATED,
            ))
        }
        Err(e) => {
            error!("Sell failed: {}", e);
            Err(warp::reject::custom(CustomError::from(e)))
        }
    }
}

async fn transactions_handler(
    session: UserSession,
    service: Arc<PortfolioService>,
    query: TransactionQuery,
) -> Result<impl Reply, Rejection> {
    let filter = match query.trade_type.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(kind) if kind.eq_ignore_ascii_case("all") => None,
        Some(kind) => match kind.parse::<TradeType>() {
            Ok(kind) => Some(kind),
            Err(message) => {
                return Err(warp::reject::custom(CustomError::new(
                    StatusCode::BAD_REQUEST,
                    message,
                )))
            }
        },
    };
    match service.transactions(&session, filter).await {
        Ok(transactions) => Ok(warp::reply::json(&transactions)),
        Err(e) => {
            error!("Failed to load transactions for {}: {}", session.email, e);
            Err(warp::reject::custom(CustomError::from(e)))
        }
    }
}

async fn insights_handler(
    session: UserSession,
    service: Arc<PortfolioService>,
    query: InsightQuery,
) -> Result<impl Reply, Rejection> {
    let symbols: Vec<String> = query
        .symbols
        .unwrap_or_default()
        .split(',')
        .map(str::to_string)
        .collect();
    match service.insights(&session, &symbols).await {
        Ok(analysis) => Ok(warp::reply::json(&analysis)),
        Err(e) => {
            error!("Insight request failed: {}", e);
            Err(warp::reject::custom(CustomError::from(e)))
        }
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = err.find::<CustomError>() {
        (e.status, e.message.clone())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "message": message })),
        status,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("BEARER  abc "), Some("abc"));
    }

    #[test]
    fn other_schemes_and_blank_tokens_are_ignored() {
        assert_eq!(bearer_token("Basic dXNlcjpwdw=="), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
