use anyhow::{Context, Result};
use futures::{Stream, StreamExt};
use lapin::{
    Channel, Connection, ConnectionProperties,
    options::{BasicConsumeOptions, QueueDeclareOptions},
    types::FieldTable,
};
use std::borrow::Cow;
use std::fmt::Display;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{ConsumeSettings, Configuration, QueueSettings};

pub struct RabbitMQConsumer {
    config: Configuration,
    connection: Option<Arc<Connection>>,
    channel: Option<Channel>,
    queue_name: Option<String>,
}

impl RabbitMQConsumer {
    pub fn new(config: Configuration) -> Self {
        Self {
            config,
            connection: None,
            channel: None,
            queue_name: None,
        }
    }

    /// Connect, open a channel and declare the configured queue
    pub async fn init(&mut self) -> Result<()> {
        info!("🐰 Initializing RabbitMQ consumer...");

        let connection =
            Connection::connect(&self.config.server_url, ConnectionProperties::default())
                .await
                .context("Failed to connect to RabbitMQ")?;

        info!("✅ Connected to RabbitMQ");

        let channel = connection
            .create_channel()
            .await
            .context("Failed to open a channel")?;

        info!("✅ Opened RabbitMQ channel");

        let queue = channel
            .queue_declare(
                &self.config.queue.queue_name,
                queue_declare_options(&self.config.queue),
                FieldTable::default(),
            )
            .await
            .context("Failed to declare a queue")?;

        let queue_name = queue.name().as_str().to_string();
        debug!(
            "✅ Declared queue: {} ({} messages, {} consumers)",
            queue_name,
            queue.message_count(),
            queue.consumer_count()
        );

        self.connection = Some(Arc::new(connection));
        self.channel = Some(channel);
        self.queue_name = Some(queue_name);

        info!("🚀 RabbitMQ consumer initialized successfully");
        Ok(())
    }

    /// Register the consumer and spawn the task that logs its deliveries.
    ///
    /// The task resolves to the number of messages it logged once the
    /// broker closes the delivery stream.
    pub async fn start_consuming(&mut self) -> Result<JoinHandle<usize>> {
        let (Some(channel), Some(queue_name)) = (&self.channel, &self.queue_name) else {
            return Err(anyhow::anyhow!("RabbitMQ consumer not initialized"));
        };

        let consumer = channel
            .basic_consume(
                queue_name,
                &self.config.consume.consumer,
                basic_consume_options(&self.config.consume),
                FieldTable::default(),
            )
            .await
            .context("Failed to register a consumer")?;

        info!("🔍 Started consuming from queue: {}", queue_name);

        let deliveries = consumer.map(|delivery| delivery.map(|d| d.data));
        Ok(tokio::spawn(log_deliveries(deliveries)))
    }

    /// Name of the declared queue, as returned by the broker
    pub fn queue_name(&self) -> Option<&str> {
        self.queue_name.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        if let Some(connection) = &self.connection {
            connection.status().connected()
        } else {
            false
        }
    }

    /// Gracefully close connection
    pub async fn close(&self) -> Result<()> {
        if let Some(connection) = &self.connection {
            connection
                .close(200, "Normal shutdown")
                .await
                .context("Failed to close connection")?;
            info!("✅ RabbitMQ connection closed gracefully");
        }
        Ok(())
    }
}

pub fn queue_declare_options(queue: &QueueSettings) -> QueueDeclareOptions {
    QueueDeclareOptions {
        passive: false,
        durable: queue.durable,
        exclusive: queue.exclusive,
        auto_delete: queue.auto_delete,
        nowait: queue.no_wait,
    }
}

pub fn basic_consume_options(consume: &ConsumeSettings) -> BasicConsumeOptions {
    BasicConsumeOptions {
        no_local: consume.no_local,
        no_ack: consume.auto_ack,
        exclusive: consume.exclusive,
        nowait: consume.no_wait,
    }
}

/// Log every message body until the stream ends, returning how many were logged.
pub async fn log_deliveries<S, B, E>(mut deliveries: S) -> usize
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    info!("📥 Starting message consumption loop...");

    let mut received = 0;
    while let Some(delivery) = deliveries.next().await {
        match delivery {
            Ok(body) => {
                info!("Received a message: {}", render_body(body.as_ref()));
                received += 1;
            }
            Err(e) => error!("❌ Error receiving message: {}", e),
        }
    }

    warn!("📥 Message consumption loop ended after {} messages", received);
    received
}

pub fn render_body(body: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(body)
}
