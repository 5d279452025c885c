use rocket::{
    fairing::{Fairing, Info, Kind},
    http::{Header, Method, Status},
    Request, Response,
};

/// A fairing that lets the frontend call the API from any origin, and answers
/// CORS preflight requests.
#[derive(Debug, Copy, Clone)]
pub struct CorsFairing;

#[rocket::async_trait]
impl Fairing for CorsFairing {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        res.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        res.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, OPTIONS",
        ));
        let allowed_headers = req
            .headers()
            .get_one("Access-Control-Request-Headers")
            .unwrap_or("Content-Type")
            .to_string();
        res.set_header(Header::new("Access-Control-Allow-Headers", allowed_headers));

        // No route answers OPTIONS, so a preflight would otherwise be a 404.
        if req.method() == Method::Options && res.status() == Status::NotFound {
            res.set_status(Status::NoContent);
            res.remove_header("Content-Type");
            res.set_sized_body(0, std::io::Cursor::new(""));
        }
    }
}
