use castswap_contracts::aspect::{select_aspect_ratio, AspectRatio, ImageSize, DEFAULT_IMAGE_SIZE};
use castswap_contracts::images::UploadedImage;
use serde_json::{json, Value};

pub const COMPOSITE_INSTRUCTION: &str = "\
You are an expert movie poster artist and photo compositor. \
The first image is an existing movie poster. Every image after it is a reference photo of a real person, provided in order. \
Recreate the poster so that the people in the reference photos replace the main characters on the poster. \
Map identities sequentially: the first reference photo replaces the first (most prominent) character on the poster, \
the second reference photo replaces the second character, and so on. \
Characters without a matching reference photo must stay unchanged, and reference photos without a matching character are ignored. \
For every replaced character, keep the facial identity of the reference person recognizable: face shape, eyes, nose, mouth, skin tone, hair and age. \
Match the original character's head angle, camera perspective, pose, body proportions and anatomy so the new face sits naturally on the existing body. \
Match the poster's lighting direction, color grading, contrast, depth of field, film grain, paint or print texture and overall rendering style, \
so the inserted people look like they were part of the original artwork. \
Preserve everything else exactly: the title, tagline, credits and all other typography, the logo, the background, costumes, props, \
the layout and composition, and the number and placement of characters. \
Do not add new people, text, borders or watermarks. \
Return only the final edited poster image.";

/// One composite request: the poster, the ordered person photos, and the
/// derived output configuration. Built fresh per generation.
#[derive(Debug, Clone)]
pub struct CompositeRequest {
    pub poster: UploadedImage,
    pub persons: Vec<UploadedImage>,
    pub aspect_ratio: AspectRatio,
    pub image_size: ImageSize,
}

impl CompositeRequest {
    pub fn new(poster: UploadedImage, persons: Vec<UploadedImage>) -> Self {
        let aspect_ratio = select_aspect_ratio(poster.width, poster.height);
        Self {
            poster,
            persons,
            aspect_ratio,
            image_size: DEFAULT_IMAGE_SIZE,
        }
    }

    /// Poster first, then each person in order, then the instruction text.
    pub fn build_parts(&self) -> Vec<Value> {
        let mut parts = Vec::with_capacity(self.persons.len() + 2);
        parts.push(inline_image_part(&self.poster));
        for person in &self.persons {
            parts.push(inline_image_part(person));
        }
        parts.push(json!({ "text": COMPOSITE_INSTRUCTION }));
        parts
    }

    pub fn payload(&self) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": self.build_parts(),
            }],
            "generationConfig": {
                "imageConfig": {
                    "aspectRatio": self.aspect_ratio.as_str(),
                    "imageSize": self.image_size.as_str(),
                }
            }
        })
    }
}

fn inline_image_part(image: &UploadedImage) -> Value {
    json!({
        "inlineData": {
            "mimeType": image.mime_type,
            "data": image.data,
        }
    })
}
