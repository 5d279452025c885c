use rocket::Route;

mod candidates;
mod mail;
mod votes;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(votes::routes());
    routes.extend(candidates::routes());
    routes.extend(mail::routes());
    routes
}
