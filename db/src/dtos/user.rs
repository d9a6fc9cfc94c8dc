/// Identity used to create a profile on first sign-in.
pub struct NewUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub photo_url: Option<String>,
}

pub struct MockupCreateRequest {
    pub template_id: String,
    pub template_name: String,
    pub image_url: Option<String>,
}
