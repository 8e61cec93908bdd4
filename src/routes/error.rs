use warp::reject::Reject;

#[derive(Debug)]
pub struct BadRequestRejection;
impl Reject for BadRequestRejection {}
