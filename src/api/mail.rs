use rocket::{serde::json::Json, Route, State};

use crate::error::{Error, Result};
use crate::mail::{Attachment, OutgoingMail, Outbox};
use crate::model::api::{mail::SendEmailRequest, reply::Reply};
use crate::Config;

pub fn routes() -> Vec<Route> {
    routes![send_email]
}

#[post("/api/send-email", data = "<request>", format = "json")]
pub async fn send_email(
    request: Json<SendEmailRequest>,
    config: &State<Config>,
    outbox: &State<Outbox>,
) -> Result<Json<Reply<()>>> {
    let pdf = request
        .pdf_bytes()
        .map_err(|e| Error::BadRequest(format!("Invalid PDF encoding: {e}")))?;
    let request = request.into_inner();
    if [&request.email, &request.name]
        .iter()
        .any(|value| value.contains(['\r', '\n']))
    {
        return Err(Error::BadRequest(
            "Email and name must be a single line".to_string(),
        ));
    }

    let mail = OutgoingMail {
        from: config.mail_sender(),
        to: request.email,
        subject: format!("Votre candidature PDF - {}", request.name),
        text: "Voici votre candidature au format PDF.".to_string(),
        attachments: vec![Attachment {
            filename: format!("{}_Candidature.pdf", request.name),
            content_type: "application/pdf".to_string(),
            content: pdf,
        }],
    };
    outbox.send(mail).await?;

    Ok(Json(Reply::ok("Email sent successfully")))
}
