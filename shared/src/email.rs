use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use aws_sdk_sesv2::Client as SesClient;
use std::env;

pub fn assignment_subject(ministry_name: &str) -> String {
    format!("You're scheduled to serve with {}", ministry_name)
}

pub fn assignment_text_body(
    recipient_name: &str,
    ministry_name: &str,
    role: &str,
    date: &str,
) -> String {
    format!(
        r#"Hi {},

You've been scheduled for an upcoming shift:

  Ministry: {}
  Role:     {}
  Date:     {}

If you can't make it, please contact your ministry leader so the shift can be reassigned.

Thank you for serving!"#,
        recipient_name, ministry_name, role, date
    )
}

pub fn assignment_html_body(
    recipient_name: &str,
    ministry_name: &str,
    role: &str,
    date: &str,
) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body {{
            font-family: Helvetica, Arial, sans-serif;
            line-height: 1.6;
            color: #333333;
        }}
        .container {{
            max-width: 600px;
            margin: 0 auto;
            padding: 40px 24px;
            border: 1px solid #e5e5e5;
        }}
        .details {{
            background: #f5f5f5;
            padding: 16px;
            margin: 24px 0;
        }}
        .details td {{
            padding: 4px 12px 4px 0;
        }}
        .footer {{
            margin-top: 32px;
            font-size: 13px;
            color: #666666;
        }}
    </style>
</head>
<body>
    <div class="container">
        <p>Hi {},</p>
        <p>You've been scheduled for an upcoming shift:</p>
        <table class="details">
            <tr><td><strong>Ministry</strong></td><td>{}</td></tr>
            <tr><td><strong>Role</strong></td><td>{}</td></tr>
            <tr><td><strong>Date</strong></td><td>{}</td></tr>
        </table>
        <p>If you can't make it, please contact your ministry leader so the shift can be reassigned.</p>
        <p class="footer">Thank you for serving!</p>
    </div>
</body>
</html>"#,
        recipient_name, ministry_name, role, date
    )
}

/// Send an assignment notification via AWS SES
pub async fn send_assignment_email(
    ses_client: &SesClient,
    to_email: &str,
    recipient_name: &str,
    ministry_name: &str,
    role: &str,
    date: &str,
) -> Result<(), String> {
    let destination = Destination::builder().to_addresses(to_email).build();

    let subject = Content::builder()
        .data(assignment_subject(ministry_name))
        .charset("UTF-8")
        .build()
        .map_err(|e| format!("Failed to build subject: {:?}", e))?;

    let html_content = Content::builder()
        .data(assignment_html_body(recipient_name, ministry_name, role, date))
        .charset("UTF-8")
        .build()
        .map_err(|e| format!("Failed to build HTML content: {:?}", e))?;

    let text_content = Content::builder()
        .data(assignment_text_body(recipient_name, ministry_name, role, date))
        .charset("UTF-8")
        .build()
        .map_err(|e| format!("Failed to build text content: {:?}", e))?;

    let body = Body::builder().html(html_content).text(text_content).build();

    let message = Message::builder().subject(subject).body(body).build();

    let email_content = EmailContent::builder().simple(message).build();

    let from_address =
        env::var("SENDER_EMAIL").unwrap_or_else(|_| "noreply@churchops.example".to_string());

    ses_client
        .send_email()
        .from_email_address(from_address)
        .destination(destination)
        .content(email_content)
        .send()
        .await
        .map_err(|e| format!("Failed to send email: {:?}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_names_the_ministry() {
        let subject = assignment_subject("Youth Ministry");
        assert!(subject.contains("Youth Ministry"));
    }

    #[test]
    fn bodies_describe_ministry_role_and_date() {
        let text = assignment_text_body("Alice", "Music", "pianist", "2026-09-06");
        assert!(text.contains("Alice"));
        assert!(text.contains("Music"));
        assert!(text.contains("pianist"));
        assert!(text.contains("2026-09-06"));

        let html = assignment_html_body("Alice", "Music", "pianist", "2026-09-06");
        assert!(html.contains("Alice"));
        assert!(html.contains("Music"));
        assert!(html.contains("pianist"));
        assert!(html.contains("2026-09-06"));
    }
}
