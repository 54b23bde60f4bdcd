//! HTML pages returned by the email verification link.

const STYLE: &str = "\
body { font-family: Arial, sans-serif; text-align: center; padding: 50px; background-color: #f5f5f5; }
.container { background-color: white; padding: 30px; border-radius: 10px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); max-width: 500px; margin: 0 auto; }
.success { color: #388e3c; background-color: #e8f5e9; padding: 15px; border-radius: 5px; margin: 20px 0; }
.error { color: #d32f2f; background-color: #ffebee; padding: 15px; border-radius: 5px; margin: 20px 0; }";

fn page(title: &str, body: &str) -> String {
  format!(
    "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
     <style>\n{STYLE}\n</style>\n</head>\n<body>\n<div class=\"container\">\n{body}\n</div>\n\
     </body>\n</html>\n"
  )
}

pub fn verified() -> String {
  page(
    "Email Verified",
    "<h1>Email Verified Successfully</h1>\n\
     <div class=\"success\"><p>Your email address has been verified.</p></div>\n\
     <p>You can close this window and log in from the app.</p>",
  )
}

pub fn invalid_link() -> String {
  page(
    "Email Verification",
    "<h1>Email Verification Failed</h1>\n\
     <div class=\"error\"><h3>Invalid or Expired Link</h3>\
     <p>The verification link is invalid or has expired.</p></div>\n\
     <p>Please try registering again.</p>",
  )
}

pub fn server_error() -> String {
  page(
    "Email Verification",
    "<h1>Server Error</h1>\n\
     <p>An error occurred during verification. Please try again later.</p>",
  )
}
