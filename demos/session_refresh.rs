//! Demonstrates a dashboard session against a mock CRM API: log in, hit an endpoint with an
//! expired access token, and let the client refresh and replay the request transparently.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use crm_session::{
	client::{GuardOutcome, ReqwestApiClient},
	config::ClientConfig,
	store::{MemoryStore, TokenStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/login/");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access\":\"expired-access\",\"refresh\":\"demo-refresh\"}");
		})
		.await;
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer expired-access");
			then.status(401).body("{\"detail\":\"Given token not valid for any token type\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/token/refresh/");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access\":\"fresh-access\"}")
				.delay(Duration::from_millis(250));
		})
		.await;
	let clients = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/clients/").header("authorization", "Bearer fresh-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("[{\"id\":1,\"name\":\"Acme Corp\"},{\"id\":2,\"name\":\"Globex\"}]");
		})
		.await;
	let profile = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/users/me/").header("authorization", "Bearer fresh-access");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":7,\"username\":\"ops\"}");
		})
		.await;
	let store = MemoryStore::default();
	let config = ClientConfig::builder(server.url("/api/")).build()?;
	let client = ReqwestApiClient::new(config, Arc::new(store.clone()) as Arc<dyn TokenStore>);

	client.login(&serde_json::json!({ "username": "ops", "password": "demo" })).await?;

	println!("Logged in; authenticated: {}.", store.snapshot().is_authenticated());

	let (first, second) = tokio::join!(client.get("/clients/"), client.get("/clients/"));

	println!("Clients: {}.", first?);
	println!("Clients (coalesced): {}.", second?);
	println!(
		"Refresh attempts: {}, coalesced waiters: {}.",
		client.refresh_metrics.attempts(),
		client.refresh_metrics.coalesced(),
	);

	let guard = client.guard().await?;

	assert_eq!(guard, GuardOutcome::Authenticated);

	login.assert_async().await;
	rejected.assert_calls_async(2).await;
	refresh.assert_calls_async(1).await;
	clients.assert_calls_async(2).await;
	profile.assert_async().await;

	Ok(())
}
